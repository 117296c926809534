//! Field lists for `multipart/form-data` uploads
//!
//! A [`Form`] only records what is sent. The transport encodes it with
//! ureq's multipart support when the request goes out.

use crate::model::ImageUpload;

/// One form field
#[derive(Debug, Clone)]
pub enum Field {
    Text { name: String, value: String },
    File { name: String, upload: ImageUpload },
}

impl Field {
    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::File { name, .. } => name,
        }
    }
}

/// A multipart form under construction
#[derive(Debug, Clone, Default)]
pub struct Form {
    fields: Vec<Field>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field
    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.push(Field::Text {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    /// Append a file field
    pub fn file(mut self, name: &str, upload: &ImageUpload) -> Self {
        self.fields.push(Field::File {
            name: name.to_string(),
            upload: upload.clone(),
        });
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Value of a text field, if present
    pub fn text_field(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|field| match field {
            Field::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// Upload attached under `name`, if any
    pub fn file_field(&self, name: &str) -> Option<&ImageUpload> {
        self.fields.iter().find_map(|field| match field {
            Field::File { name: n, upload } if n == name => Some(upload),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_keep_insertion_order() {
        let upload = ImageUpload::new("cat.png", vec![0x89, 0x50]);
        let form = Form::new().text("body", "hello").file("image", &upload);

        let names: Vec<&str> = form.fields().iter().map(Field::name).collect();
        assert_eq!(names, ["body", "image"]);
        assert_eq!(form.file_field("image").unwrap().content_type, "image/png");
    }

    #[test]
    fn field_lookup() {
        let form = Form::new().text("body", "x").text("image", "");
        assert_eq!(form.text_field("body"), Some("x"));
        assert_eq!(form.text_field("image"), Some(""));
        assert!(form.file_field("image").is_none());
    }
}
