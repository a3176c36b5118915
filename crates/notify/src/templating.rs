//! Minijinja template rendering for notification messages.
//!
//! Rules may replace the built-in table body with their own template, and
//! webhooks may shape their request body. Both render arbitrary strings, so
//! a fresh [`minijinja::Environment`] is created per render call.

use serde::Serialize;

use crate::traits::NotifyError;

/// Renders notification templates using minijinja.
#[derive(Debug, Default)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Build a configured minijinja environment with custom filters and globals.
    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("round", round_filter);
        env.add_filter("short_type", short_type_filter);
        env.add_filter("short_zone", short_zone_filter);
        env.add_function("env", env_function);
        env
    }

    /// Render a template string with any serializable context.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render<S: Serialize>(&self, template_str: &str, ctx: &S) -> Result<String, NotifyError> {
        let env = Self::build_env();
        env.render_str(template_str, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Validate that a template string parses without errors.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }
}

/// Round a float to N decimal places.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}

/// `ecs.c5.xlarge` → `c5.xlarge`.
fn short_type_filter(value: String) -> String {
    crate::render::short_instance_type(&value).to_string()
}

/// `cn-hangzhou-b` with region `cn-hangzhou` → `b`.
fn short_zone_filter(value: String, region: String) -> String {
    crate::render::short_zone(&value, &region).to_string()
}

/// Read an environment variable by name; empty (with a warning) if unset.
fn env_function(name: String) -> String {
    match std::env::var(&name) {
        Ok(val) => val,
        Err(_) => {
            tracing::warn!(var = %name, "Environment variable not found, returning empty string");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        instance_type_id: &'static str,
        zone_id: &'static str,
        price_per_core: f64,
    }

    #[derive(Serialize)]
    struct Ctx {
        rule: &'static str,
        classification: &'static str,
        items: Vec<Row>,
    }

    fn sample() -> Ctx {
        Ctx {
            rule: "hangzhou-c5",
            classification: "alarm",
            items: vec![
                Row {
                    instance_type_id: "ecs.c5.xlarge",
                    zone_id: "cn-hangzhou-b",
                    price_per_core: 0.0312345,
                },
                Row {
                    instance_type_id: "ecs.c6.2xlarge",
                    zone_id: "cn-hangzhou-h",
                    price_per_core: 0.04,
                },
            ],
        }
    }

    #[test]
    fn render_basic_template() {
        let out = TemplateRenderer::new()
            .render("{{ rule }} is {{ classification | upper }}", &sample())
            .unwrap();
        assert_eq!(out, "hangzhou-c5 is ALARM");
    }

    #[test]
    fn render_rows_with_filters() {
        let tmpl = "{% for r in items %}{{ r.instance_type_id | short_type }}@{{ r.zone_id | short_zone('cn-hangzhou') }}={{ r.price_per_core | round(3) }};{% endfor %}";
        let out = TemplateRenderer::new().render(tmpl, &sample()).unwrap();
        assert_eq!(out, "c5.xlarge@b=0.031;c6.2xlarge@h=0.040;");
    }

    #[test]
    fn render_env_function() {
        std::env::set_var("SPOT_NOTIFY_TEST_VAR", "hello_notify");
        let out = TemplateRenderer::new()
            .render("Env: {{ env('SPOT_NOTIFY_TEST_VAR') }}", &sample())
            .unwrap();
        assert_eq!(out, "Env: hello_notify");
        std::env::remove_var("SPOT_NOTIFY_TEST_VAR");
    }

    #[test]
    fn render_env_missing_returns_empty() {
        let out = TemplateRenderer::new()
            .render("Env: [{{ env('DEFINITELY_NOT_SET_XYZ') }}]", &sample())
            .unwrap();
        assert_eq!(out, "Env: []");
    }

    #[test]
    fn invalid_template_produces_error() {
        let result = TemplateRenderer::new().render("{{ unclosed", &sample());
        match result.unwrap_err() {
            NotifyError::Template(msg) => assert!(!msg.is_empty()),
            other => panic!("Expected Template error, got: {:?}", other),
        }
    }

    #[test]
    fn validate_checks_syntax_only() {
        let renderer = TemplateRenderer::new();
        assert!(renderer.validate("Hello {{ anything.at.all }}").is_ok());
        assert!(renderer.validate("{% for x in %}").is_err());
    }
}
