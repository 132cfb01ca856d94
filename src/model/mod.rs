use serde::{Deserialize, Serialize};

/// One catalog entry, built from one spreadsheet row.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Costume {
    pub id: String,
    pub name: String,
    pub category: String,
    pub size: String,
    pub color: String,
    pub image_url: String,
    pub description: String,
    pub available: bool,
}

impl Costume {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "No Title"
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_keys() {
        let costume = Costume {
            id: "1".to_string(),
            image_url: "https://example.com/a.png".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&costume).unwrap();
        assert_eq!(json["imageUrl"], "https://example.com/a.png");
        assert_eq!(json["available"], false);
    }

    #[test]
    fn empty_name_falls_back() {
        assert_eq!(Costume::default().display_name(), "No Title");
    }
}
