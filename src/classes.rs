use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Label metadata for one classifier output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassInfo
{
    /// Short code, e.g. "nv".
    pub code: String,
    /// Human-readable name shown to the user.
    pub description: String,
}

impl ClassInfo
{
    pub fn new(code: &str, description: &str) -> Self
    {
        ClassInfo { code: code.to_string(), description: description.to_string() }
    }
}

/// Maps classifier output indices to labels.
/// The position in the table is the class index, so the order must match the order
/// the model was trained with. The table is read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassTable
{
    classes: Vec<ClassInfo>,
}

impl ClassTable
{
    pub fn new(classes: Vec<ClassInfo>) -> Result<Self, Error>
    {
        if classes.is_empty() {
            return Err(Error::Config("The class table must contain at least one class".to_string()));
        }
        Ok(ClassTable { classes })
    }

    /// The seven HAM10000 lesion classes, in the order the skin model was trained with.
    pub fn skin_lesions() -> Self
    {
        ClassTable {
            classes: vec![
                ClassInfo::new("akiec", "Actinic Keratoses and Intraepithelial Carcinomae"),
                ClassInfo::new("bcc", "Basal Cell Carcinoma"),
                ClassInfo::new("bkl", "Benign Keratosis-Like Lesions"),
                ClassInfo::new("df", "Dermatofibroma"),
                ClassInfo::new("nv", "Melanocytic Nevi"),
                ClassInfo::new("vasc", "Pyogenic Granulomas and Hemorrhage"),
                ClassInfo::new("mel", "Melanoma"),
            ],
        }
    }

    pub fn get(&self, index: usize) -> Option<&ClassInfo>
    {
        self.classes.get(index)
    }

    pub fn len(&self) -> usize
    {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassInfo>
    {
        self.classes.iter()
    }
}

impl Default for ClassTable
{
    fn default() -> Self
    {
        Self::skin_lesions()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn skin_lesion_table_order()
    {
        let table = ClassTable::skin_lesions();
        assert_eq!(table.len(), 7);
        assert_eq!(table.get(0).unwrap().code, "akiec");
        assert_eq!(table.get(4).unwrap().description, "Melanocytic Nevi");
        assert_eq!(table.get(6).unwrap().code, "mel");
        assert!(table.get(7).is_none());
    }

    #[test]
    fn empty_table_is_rejected()
    {
        assert!(matches!(ClassTable::new(vec![]), Err(Error::Config(_))));
    }

    #[test]
    fn class_info_deserialization()
    {
        let json = r#"[{"code": "a", "description": "Alpha"}, {"code": "b", "description": "Beta"}]"#;
        let classes: Vec<ClassInfo> = serde_json::from_str(json).unwrap();
        let table = ClassTable::new(classes).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.iter().map(|c| c.code.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
