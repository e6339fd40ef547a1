fn main() {
    println!("cargo:rerun-if-changed=assets/app.manifest");
    println!("cargo:rerun-if-changed=assets/app.ico");

    #[cfg(target_os = "windows")]
    {
        use std::path::Path;

        let manifest = Path::new("assets/app.manifest");
        let icon = Path::new("assets/app.ico");
        if !manifest.exists() && !icon.exists() {
            return;
        }

        let mut res = winres::WindowsResource::new();
        if manifest.exists() {
            res.set_manifest_file("assets/app.manifest");
        }
        if icon.exists() {
            res.set_icon("assets/app.ico");
        }
        if let Err(err) = res.compile() {
            panic!("failed to embed Windows resources: {err}");
        }
    }
}
