use minijinja::{Environment, Value};
use tracing::error;

pub const INDEX_TEMPLATE: &str = "index.html";

pub fn init_templates() -> Environment<'static> {
    let mut env = Environment::new();
    env.add_template(INDEX_TEMPLATE, include_str!("../../templates/index.html"))
        .expect("index template must parse");

    env
}

pub fn render_template(env: &Environment, template_name: &str, context: Value) -> String {
    match env.get_template(template_name) {
        Ok(tmpl) => match tmpl.render(context) {
            Ok(result) => result,
            Err(e) => {
                error!("Template render error: {}", e);
                format!("<h1>Template Error</h1><p>{}</p>", e)
            }
        },
        Err(e) => {
            error!("Template not found: {} ({})", template_name, e);
            format!("<h1>Template Not Found</h1><p>{}: {}</p>", template_name, e)
        }
    }
}
