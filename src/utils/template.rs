//! String template rendering utilities.

pub struct TemplateVars;

impl TemplateVars {
    pub const LIBOS: &'static str = "libos";
    pub const SERVER_NAME: &'static str = "server_name";
    pub const SERVER_IP: &'static str = "server_ip";
    pub const CLIENT_NAME: &'static str = "client_name";
    pub const CLIENT_IP: &'static str = "client_ip";
}

pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}
