//! HTML page rendering.
//!
//! Templates are compiled into the binary and rendered with auto-escaping, so uploaded filenames
//! are always safe to interpolate.

use minijinja::Environment;
use serde::Serialize;
use std::sync::Arc;

const TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", include_str!("../templates/layout.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("sender.html", include_str!("../templates/sender.html")),
    ("receiver.html", include_str!("../templates/receiver.html")),
];

/// Shared, pre-parsed page templates.
#[derive(Clone)]
pub struct Templates {
    env: Arc<Environment<'static>>,
}

impl Templates {
    pub fn load() -> anyhow::Result<Self> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env: Arc::new(env) })
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> anyhow::Result<String> {
        Ok(self.env.get_template(name)?.render(ctx)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn test_filenames_are_escaped() {
        let templates = Templates::load().unwrap();
        let html = templates
            .render(
                "receiver.html",
                context! {
                    batch_id => "b1",
                    files => vec!["<script>alert(1)</script>.txt"],
                },
            )
            .unwrap();

        assert!(!html.contains("<script>alert(1)</script>.txt"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_receiver_has_one_checkbox_per_file() {
        let templates = Templates::load().unwrap();
        let html = templates
            .render(
                "receiver.html",
                context! {
                    batch_id => "b1",
                    files => vec!["a.txt", "b.txt", "c.txt"],
                },
            )
            .unwrap();

        assert_eq!(html.matches("name=\"file\"").count(), 3);
        // Every file starts selected, and so does "Select all"
        assert_eq!(html.matches("\" checked>").count(), 4);
    }

    #[test]
    fn test_sender_embeds_link_and_code() {
        let templates = Templates::load().unwrap();
        let html = templates
            .render(
                "sender.html",
                context! {
                    batch_id => "b1",
                    files => vec!["a.txt"],
                    share_url => "http://localhost:5000/receiver/b1",
                    qr_src => "/static/b1.png",
                },
            )
            .unwrap();

        // Auto-escaping may entity-encode the slashes
        assert!(html.contains("localhost:5000"));
        assert!(html.contains("b1.png"));
        assert!(html.contains("upload_additional"));
        assert!(html.contains("<li>a.txt</li>"));
    }

    #[test]
    fn test_unknown_template_is_an_error() {
        let templates = Templates::load().unwrap();
        assert!(templates.render("missing.html", context! {}).is_err());
    }
}
