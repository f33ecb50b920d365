use std::process::Command;

fn main() {
    // Only rebuild CSS when template or CSS files change
    println!("cargo:rerun-if-changed=assets/css/input.css");
    println!("cargo:rerun-if-changed=templates/");

    // Try to run Tailwind CSS standalone CLI
    let status = Command::new("tailwindcss")
        .args([
            "-i",
            "assets/css/input.css",
            "-o",
            "assets/css/output.css",
            "--minify",
        ])
        .status();

    match status {
        Ok(s) if s.success() => {
            println!("cargo:warning=Tailwind CSS compiled successfully");
        }
        _ => {
            // Tailwind CLI not available; write a hand-kept fallback
            // covering every class the templates use
            println!("cargo:warning=Tailwind CLI not found, using fallback CSS");
            let fallback = r#"*, *::before, *::after { box-sizing: border-box; margin: 0; padding: 0; }
body { font-family: system-ui, -apple-system, sans-serif; line-height: 1.6; color: #1c1917; background: #fafaf9; -webkit-font-smoothing: antialiased; }
ul { list-style: none; }
a { color: inherit; text-decoration: none; }
a:hover { opacity: 0.85; }
.min-h-screen { min-height: 100vh; }
.mx-auto { margin-left: auto; margin-right: auto; }
.ml-auto { margin-left: auto; }
.ml-2 { margin-left: 0.5rem; }
.mt-1 { margin-top: 0.25rem; }
.mt-16 { margin-top: 4rem; }
.mb-2 { margin-bottom: 0.5rem; }
.mb-4 { margin-bottom: 1rem; }
.mb-8 { margin-bottom: 2rem; }
.max-w-5xl { max-width: 64rem; }
.max-w-xl { max-width: 36rem; }
.max-w-md { max-width: 28rem; }
.px-4 { padding-left: 1rem; padding-right: 1rem; }
.py-3 { padding-top: 0.75rem; padding-bottom: 0.75rem; }
.py-8 { padding-top: 2rem; padding-bottom: 2rem; }
.py-16 { padding-top: 4rem; padding-bottom: 4rem; }
.flex { display: flex; }
.items-center { align-items: center; }
.justify-center { justify-content: center; }
.justify-between { justify-content: space-between; }
.gap-3 { gap: 0.75rem; }
.gap-4 { gap: 1rem; }
.text-center { text-align: center; }
.text-xs { font-size: 0.75rem; }
.text-sm { font-size: 0.875rem; }
.text-lg { font-size: 1.125rem; }
.text-xl { font-size: 1.25rem; }
.text-4xl { font-size: 2.25rem; line-height: 1.2; }
.font-medium { font-weight: 500; }
.font-semibold { font-weight: 600; }
.font-bold { font-weight: 700; }
.text-white { color: #fff; }
.text-stone-400 { color: #a8a29e; }
.text-stone-500 { color: #78716c; }
.text-stone-600 { color: #57534e; }
.text-stone-700 { color: #44403c; }
.bg-white { background-color: #fff; }
.bg-stone-50 { background-color: #fafaf9; }
.border-b { border-bottom: 1px solid; }
.border-stone-100 { border-color: #f5f5f4; }
.border-stone-200 { border-color: #e7e5e4; }
.whitespace-pre-wrap { white-space: pre-wrap; }
.btn { display: inline-flex; align-items: center; justify-content: center; padding: 0.5rem 1rem; border-radius: 0.5rem; font-size: 0.875rem; font-weight: 500; transition: all 0.15s; cursor: pointer; text-decoration: none; }
.btn-primary { background: #1c1917; color: #fff; border: none; }
.btn-primary:hover { background: #44403c; }
.btn-secondary { background: #fff; color: #1c1917; border: 1px solid #d6d3d1; }
.btn-secondary:hover { background: #f5f5f4; }
.card { background: #fff; border-radius: 0.75rem; border: 1px solid #e7e5e4; padding: 1.5rem; box-shadow: 0 1px 2px 0 rgb(0 0 0 / 0.05); }
.link { text-decoration: underline; color: #44403c; }
.link:hover { color: #1c1917; }
.notice { margin: 1rem auto 0; max-width: 64rem; padding: 0.75rem 1rem; border-radius: 0.5rem; font-size: 0.875rem; }
.notice-info { background: #f5f5f4; color: #44403c; border: 1px solid #e7e5e4; }
.notice-warning { background: #fffbeb; color: #92400e; border: 1px solid #fde68a; }
.form { display: flex; flex-direction: column; gap: 1rem; }
.form-field { display: flex; flex-direction: column; gap: 0.25rem; font-size: 0.875rem; font-weight: 500; color: #44403c; flex: 1; }
.form-field input, .form-field textarea { padding: 0.5rem 0.75rem; border: 1px solid #d6d3d1; border-radius: 0.5rem; font-size: 0.875rem; font-weight: 400; font-family: inherit; }
.divider { margin: 1rem 0; text-align: center; font-size: 0.75rem; color: #a8a29e; text-transform: uppercase; }
.badge { margin-left: 0.5rem; padding: 0.125rem 0.5rem; border-radius: 9999px; background: #f5f5f4; font-size: 0.75rem; font-weight: 400; color: #78716c; }
.avatar { width: 2rem; height: 2rem; border-radius: 9999px; object-fit: cover; background: #e7e5e4; }
.avatar-lg { width: 4rem; height: 4rem; }
.icon-btn { border: none; background: transparent; font-size: 1.25rem; color: #a8a29e; cursor: pointer; }
.icon-btn:hover { color: #44403c; }
.icon-btn.liked { color: #f43f5e; }
.icon-btn.collected { color: #f59e0b; }
.bricks { display: grid; grid-template-columns: repeat(auto-fill, minmax(280px, 1fr)); gap: 1.25rem; }
.brick { padding: 0; overflow: hidden; }
.brick-cover { height: 13rem; background-color: #e7e5e4; background-size: cover; background-position: center; }
.brick-info { padding: 1rem; }
.friend-list { list-style: none; }
.page { background: #fff; border-radius: 0.75rem; border: 1px solid #e7e5e4; padding: 1.5rem; box-shadow: 0 1px 2px 0 rgb(0 0 0 / 0.05); margin-bottom: 1.5rem; }
.page-text p { margin-bottom: 0.75rem; line-height: 1.7; }
.page-gallery { display: grid; grid-template-columns: repeat(2, 1fr); gap: 0.75rem; }
.page-gallery img { width: 100%; border-radius: 0.5rem; display: block; }
.page-split { display: flex; gap: 1.5rem; align-items: stretch; }
.split-text { width: 40%; line-height: 1.7; }
.split-photos { display: flex; flex: 1; gap: 1rem; }
.split-photo { height: 18rem; flex: 1; border-radius: 0.5rem; background-color: #e7e5e4; background-size: cover; background-position: center; }
.map-frame { width: 100%; height: 20rem; border: none; border-radius: 0.5rem; }
"#;
            std::fs::create_dir_all("assets/css").ok();
            std::fs::write("assets/css/output.css", fallback).ok();
        }
    }
}
