use gl_triangles::app;
use gl_triangles::logging::{init_logging, LoggingConfig};
use gl_triangles::platform::GlutinWindow;
use gl_triangles::scene::Scene;
use std::process;

fn main() {
    init_logging(LoggingConfig::default());
    process::exit(app::launch(Scene::Blank, GlutinWindow::create));
}
