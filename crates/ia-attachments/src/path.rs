//! URL and storage-key interpolation
//!
//! Templates such as `attachments/:id/:revision/:filename` are rendered per
//! attachment. Unknown `:placeholders` are left untouched.

use ia_core::Id;

/// Values substituted into a template
#[derive(Debug, Clone)]
pub struct PathParams<'a> {
    pub id: Id,
    pub revision: usize,
    pub file_name: &'a str,
}

impl PathParams<'_> {
    /// The file name with path separators neutralised
    fn safe_file_name(&self) -> String {
        self.file_name.replace(['/', '\\'], "_")
    }

    fn split_name(&self) -> (String, String) {
        let name = self.safe_file_name();
        match name.rfind('.') {
            Some(pos) if pos > 0 => (name[..pos].to_string(), name[pos + 1..].to_string()),
            _ => (name, String::new()),
        }
    }

    fn value(&self, placeholder: &str) -> Option<String> {
        match placeholder {
            "class" => Some("attachments".to_string()),
            "id" => Some(self.id.to_string()),
            "revision" => Some(self.revision.to_string()),
            "filename" => Some(self.safe_file_name()),
            "basename" => Some(self.split_name().0),
            "extension" => Some(self.split_name().1),
            _ => None,
        }
    }
}

/// Render `template` for one attachment
pub fn interpolate(template: &str, params: &PathParams<'_>) -> String {
    let mut out = String::with_capacity(template.len() + params.file_name.len());
    let mut rest = template;

    while let Some(pos) = rest.find(':') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());

        match params.value(&after[..len]) {
            Some(value) => out.push_str(&value),
            None => {
                out.push(':');
                out.push_str(&after[..len]);
            }
        }
        rest = &after[len..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(file_name: &str) -> PathParams<'_> {
        PathParams {
            id: 42,
            revision: 3,
            file_name,
        }
    }

    #[test]
    fn test_plain_template() {
        assert_eq!(
            interpolate("attachments/:id/:filename", &params("invoice.csv")),
            "attachments/42/invoice.csv"
        );
    }

    #[test]
    fn test_revision_template() {
        assert_eq!(
            interpolate("/system/:class/:id/:revision/:filename", &params("invoice.csv")),
            "/system/attachments/42/3/invoice.csv"
        );
    }

    #[test]
    fn test_basename_and_extension() {
        assert_eq!(
            interpolate(":basename-r:revision.:extension", &params("archive.tar.gz")),
            "archive.tar-r3.gz"
        );
        assert_eq!(interpolate(":basename|:extension", &params("README")), "README|");
        assert_eq!(interpolate(":basename|:extension", &params(".env")), ".env|");
    }

    #[test]
    fn test_separators_in_file_name() {
        assert_eq!(
            interpolate("attachments/:id/:filename", &params("../../etc\\passwd")),
            "attachments/42/.._.._etc_passwd"
        );
    }

    #[test]
    fn test_unknown_placeholders_kept() {
        assert_eq!(
            interpolate("http://host:8080/:style/:id", &params("a.csv")),
            "http://host:8080/:style/42"
        );
    }
}
