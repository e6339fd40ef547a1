pub fn build_main_ui_html() -> String {
    MAIN_UI_HTML.to_string()
}

const MAIN_UI_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Logo Studio</title>
  <style>
    :root {
      --bg: #0f172a;
      --panel: #1e293b;
      --line: #334155;
      --input-bg: #0f172a;
      --input-line: #475569;
      --text: #f1f5f9;
      --muted: #94a3b8;
      --accent: #6366f1;
      --accent-hover: #818cf8;
      --danger-bg: rgba(239, 68, 68, 0.1);
      --danger-line: rgba(239, 68, 68, 0.3);
      --ctrl-h: 36px;
    }
    * { box-sizing: border-box; }
    body {
      margin: 0;
      color: var(--text);
      background: var(--bg);
      font-family: "Segoe UI", "Helvetica Neue", sans-serif;
      font-size: 14px;
    }
    .wrap {
      max-width: 1120px;
      margin: 0 auto;
      padding: 24px 16px;
    }
    header {
      text-align: center;
      margin-bottom: 24px;
    }
    header h1 {
      margin: 0 0 6px;
      font-size: 32px;
    }
    header p {
      margin: 0;
      color: var(--muted);
    }
    .hidden { display: none !important; }
    .panel {
      border: 1px solid var(--line);
      background: var(--panel);
      border-radius: 12px;
      padding: 20px;
    }
    .gate {
      max-width: 440px;
      margin: 48px auto;
      text-align: center;
    }
    .gate h2 { margin: 0 0 8px; }
    .gate p { color: var(--muted); }
    .gate a { color: var(--accent-hover); }
    .layout {
      display: grid;
      grid-template-columns: 380px 1fr;
      gap: 20px;
      align-items: start;
    }
    .error {
      margin-bottom: 16px;
      padding: 12px;
      border: 1px solid var(--danger-line);
      background: var(--danger-bg);
      border-radius: 8px;
      color: #fecaca;
      text-align: center;
    }
    label {
      display: block;
      margin: 12px 0 4px;
      color: var(--muted);
      font-size: 12px;
      font-weight: 600;
    }
    select, input, button {
      font: inherit;
    }
    select, input {
      width: 100%;
      height: var(--ctrl-h);
      border: 1px solid var(--input-line);
      background: var(--input-bg);
      padding: 0 10px;
      border-radius: 6px;
      color: var(--text);
      outline: none;
    }
    select:focus, input:focus {
      border-color: var(--accent);
    }
    .btn {
      min-width: 110px;
      height: 38px;
      border: 1px solid var(--accent);
      background: var(--accent);
      color: #ffffff;
      border-radius: 6px;
      font-weight: 600;
      padding: 0 14px;
      cursor: pointer;
    }
    .btn:hover { background: var(--accent-hover); }
    .btn:disabled {
      opacity: 0.45;
      cursor: not-allowed;
    }
    .btn.secondary {
      background: transparent;
      border-color: var(--input-line);
    }
    .btn.wide {
      width: 100%;
      margin-top: 18px;
    }
    .display {
      min-height: 460px;
      display: flex;
      flex-direction: column;
      align-items: center;
      justify-content: center;
      text-align: center;
    }
    .display img {
      max-width: 100%;
      max-height: 520px;
      border-radius: 8px;
      background: #ffffff;
    }
    .display .muted { color: var(--muted); }
    .spinner {
      width: 32px;
      height: 32px;
      border: 3px solid var(--line);
      border-top-color: var(--accent);
      border-radius: 50%;
      animation: spin 0.9s linear infinite;
      margin-bottom: 12px;
    }
    @keyframes spin { to { transform: rotate(360deg); } }
    .actions {
      margin-top: 14px;
      display: flex;
      gap: 8px;
      justify-content: center;
    }
    .prompt {
      margin-top: 14px;
      color: var(--muted);
      font-size: 12px;
      white-space: pre-wrap;
      text-align: left;
      width: 100%;
    }
    .status {
      margin-top: 8px;
      min-height: 16px;
      color: var(--muted);
      font-size: 11px;
      text-align: center;
    }
    @media (max-width: 900px) {
      .layout { grid-template-columns: 1fr; }
    }
  </style>
</head>
<body>
  <main class="wrap">
    <header>
      <h1>Logo Studio</h1>
      <p>Describe your brand and generate a logo with Gemini.</p>
    </header>

    <section id="checking" class="panel gate">
      <div class="spinner" style="margin: 0 auto 12px"></div>
      <p>Verifying API access...</p>
    </section>

    <section id="gate" class="panel gate hidden">
      <h2>API Key Required</h2>
      <p>To generate logos you need a Gemini API key from a Google Cloud project with billing enabled.</p>
      <button id="selectKey" class="btn wide">Select API Key</button>
      <button id="verifyKey" class="btn secondary wide" style="margin-top: 8px">I've Added My Key</button>
      <p style="font-size: 12px">
        Learn more about billing at
        <a href="https://ai.google.dev/gemini-api/docs/billing" target="_blank" rel="noopener noreferrer">Google Gemini API Pricing</a>
      </p>
    </section>

    <section id="studio" class="hidden">
      <div id="error" class="error hidden"></div>
      <div class="layout">
        <form id="form" class="panel" autocomplete="off">
          <h2 style="margin: 0">Logo Details</h2>
          <label for="brandName">Brand Name *</label>
          <input id="brandName" name="brand_name" type="text" placeholder="e.g. Nexus, Galaxy Coffee..." />
          <label for="slogan">Slogan (optional)</label>
          <input id="slogan" name="slogan" type="text" placeholder="e.g. The Future of Tech" />
          <label for="style">Style</label>
          <select id="style" name="style"></select>
          <label for="colors">Colors (optional)</label>
          <input id="colors" name="colors" type="text" placeholder="e.g. Blue and Gold, Neon Green, Black &amp; White" />
          <label for="iconSymbol">Symbol Idea (optional)</label>
          <input id="iconSymbol" name="icon_symbol" type="text" placeholder="e.g. A rocket, a coffee cup, abstract triangle" />
          <button id="generate" type="submit" class="btn wide" disabled>Generate Logo</button>
        </form>

        <section class="panel display">
          <div id="empty">
            <p class="muted">Fill out the details on the left and hit generate to see your new brand identity come to life.</p>
          </div>
          <div id="busy" class="hidden">
            <div class="spinner" style="margin: 0 auto 12px"></div>
            <p>Designing your logo...</p>
            <p class="muted">Thinking about typography, colors, and composition.</p>
            <div class="actions">
              <button id="cancel" class="btn secondary">Cancel</button>
            </div>
          </div>
          <div id="result" class="hidden" style="width: 100%">
            <img id="logoImage" alt="Generated Logo" />
            <div class="actions">
              <button id="download" class="btn">Download</button>
              <button id="newDesign" class="btn secondary">New Design</button>
            </div>
            <div id="prompt" class="prompt"></div>
          </div>
        </section>
      </div>
    </section>
    <div id="status" class="status"></div>
  </main>

  <script>
    const state = {
      phase: "awaiting_key",
      styles: [],
      default_style: "",
      logo: null,
      error: null,
    };

    function byId(id) {
      return document.getElementById(id);
    }

    function show(id, visible) {
      byId(id).classList.toggle("hidden", !visible);
    }

    function setStatus(message) {
      byId("status").textContent = message || "";
    }

    async function apiGet(path) {
      const res = await fetch(path, { method: "GET" });
      const data = await res.json();
      if (!res.ok || !data.ok) {
        throw new Error(data.error || "request failed");
      }
      return data;
    }

    async function apiPost(path, body) {
      const res = await fetch(path, {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: JSON.stringify(body || {}),
      });
      const data = await res.json();
      if (!res.ok || !data.ok) {
        throw new Error(data.error || "request failed");
      }
      return data;
    }

    function applySnapshot(payload) {
      state.phase = payload.phase;
      state.logo = payload.logo || null;
      state.error = payload.error || null;
      if (Array.isArray(payload.styles) && state.styles.length === 0) {
        state.styles = payload.styles;
        state.default_style = payload.default_style || payload.styles[0] || "";
        renderStyles();
      }
      render();
    }

    function renderStyles() {
      const select = byId("style");
      select.innerHTML = "";
      for (const style of state.styles) {
        const option = document.createElement("option");
        option.value = style;
        option.textContent = style;
        option.selected = style === state.default_style;
        select.appendChild(option);
      }
    }

    function updateSubmit() {
      const generating = state.phase === "generating";
      const brand = byId("brandName").value.trim();
      const button = byId("generate");
      button.disabled = generating || !brand;
      button.textContent = generating ? "Creating..." : "Generate Logo";
    }

    function render() {
      const phase = state.phase;
      show("checking", phase === "awaiting_key");
      show("gate", phase === "key_required");
      show("studio", phase === "idle" || phase === "generating" || phase === "ready" || phase === "failed");

      const error = byId("error");
      error.textContent = state.error || "";
      show("error", !!state.error && phase !== "key_required");
      if (phase === "key_required" && state.error) {
        setStatus(state.error);
      }

      show("busy", phase === "generating");
      show("result", phase === "ready" && !!state.logo);
      show("empty", phase !== "generating" && !(phase === "ready" && state.logo));

      if (state.logo) {
        byId("logoImage").src = state.logo.image_data;
        byId("prompt").textContent = `AI Prompt: ${state.logo.prompt_text}`;
      } else {
        byId("logoImage").removeAttribute("src");
        byId("prompt").textContent = "";
      }

      updateSubmit();
    }

    function downloadLogo() {
      if (!state.logo) {
        return;
      }
      const link = document.createElement("a");
      link.href = state.logo.image_data;
      link.download = state.logo.file_name;
      document.body.appendChild(link);
      link.click();
      document.body.removeChild(link);
    }

    async function init() {
      try {
        const data = await apiGet("/app/init");
        applySnapshot(data);
        setStatus("");
      } catch (err) {
        setStatus(`Startup error: ${err.message}`);
      }
    }

    async function keyCheck(path) {
      state.phase = "awaiting_key";
      render();
      try {
        const data = await apiPost(path, {});
        applySnapshot(data);
        if (data.phase === "key_required") {
          setStatus("No API key selected yet.");
        } else {
          setStatus("");
        }
      } catch (err) {
        setStatus(`Key check failed: ${err.message}`);
        state.phase = "key_required";
        render();
      }
    }

    byId("selectKey").addEventListener("click", () => keyCheck("/app/select-key"));
    byId("verifyKey").addEventListener("click", () => keyCheck("/app/verify-key"));

    // The key file is edited outside the window; re-check when focus returns.
    window.addEventListener("focus", () => {
      if (state.phase === "key_required") {
        keyCheck("/app/verify-key");
      }
    });

    byId("brandName").addEventListener("input", updateSubmit);

    byId("form").addEventListener("submit", async (event) => {
      event.preventDefault();
      if (state.phase === "generating" || !byId("brandName").value.trim()) {
        return;
      }
      const body = {
        brand_name: byId("brandName").value,
        slogan: byId("slogan").value,
        style: byId("style").value,
        colors: byId("colors").value,
        icon_symbol: byId("iconSymbol").value,
      };
      state.phase = "generating";
      state.logo = null;
      state.error = null;
      render();
      try {
        const data = await apiPost("/app/generate", body);
        applySnapshot(data);
        setStatus("");
      } catch (err) {
        setStatus(`Generate failed: ${err.message}`);
        await init();
      }
    });

    byId("cancel").addEventListener("click", async () => {
      try {
        await apiPost("/app/cancel", {});
      } catch (err) {
        setStatus(`Cancel failed: ${err.message}`);
      }
    });

    byId("download").addEventListener("click", downloadLogo);

    byId("newDesign").addEventListener("click", async () => {
      try {
        const data = await apiPost("/app/new-design", {});
        applySnapshot(data);
        setStatus("");
      } catch (err) {
        setStatus(`Reset failed: ${err.message}`);
      }
    });

    init();
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::build_main_ui_html;

    #[test]
    fn page_drives_every_api_route() {
        let html = build_main_ui_html();
        for route in [
            "/app/init",
            "/app/verify-key",
            "/app/select-key",
            "/app/generate",
            "/app/cancel",
            "/app/new-design",
        ] {
            assert!(html.contains(route), "page does not call {route}");
        }
    }

    #[test]
    fn gate_offers_a_recheck_without_reopening_selection() {
        let html = build_main_ui_html();
        assert!(html.contains(r#"id="verifyKey""#));
        assert!(html.contains(r#"keyCheck("/app/verify-key")"#));
    }
}
