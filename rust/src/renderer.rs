use crate::logo::LogoRequest;

pub const DEFAULT_COLORS: &str = "Brand appropriate colors";
pub const DEFAULT_SYMBOL: &str = "A unique creative symbol representing the brand";

pub fn render_prompt(request: &LogoRequest) -> String {
    let brand_name = request.brand_name.trim();
    let slogan = request.slogan.trim();
    let colors = non_empty_or(&request.colors, DEFAULT_COLORS);
    let icon_symbol = non_empty_or(&request.icon_symbol, DEFAULT_SYMBOL);

    let mut lines = vec![format!(
        "Design a professional high-quality logo for a brand named \"{brand_name}\"."
    )];
    if !slogan.is_empty() {
        lines.push(format!(
            "Include the slogan text: \"{slogan}\" in a smaller font."
        ));
    }
    lines.push(String::new());
    lines.push(format!("Style: {}.", request.style.label()));
    lines.push(format!("Color Palette: {colors}."));
    lines.push(format!("Icon/Symbol preferences: {icon_symbol}."));
    lines.push(String::new());
    lines.push("Technical requirements:".to_string());
    lines.push("- High contrast, vector-like aesthetic.".to_string());
    lines.push("- Centered composition on a clean white background.".to_string());
    lines.push("- Clear, legible typography.".to_string());
    lines.push("- No realistic photos, stick to graphic design/logo aesthetics.".to_string());
    lines.push(format!(
        "- Ensure the text \"{brand_name}\" is spelled correctly."
    ));
    lines.join("\n")
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() {
        fallback
    } else {
        value
    }
}
