use lopdf::{Dictionary, Object};

/// Build a page's resources dictionary for image-only content
///
/// The page draws nothing but XObjects, so it declares the PDF and
/// ImageC procedure sets and merges the given XObject names.
pub fn page_resources(xobject_dict: &Dictionary) -> Dictionary {
    let mut resources = Dictionary::new();
    resources.set(
        "ProcSet",
        vec![Object::Name(b"PDF".to_vec()), Object::Name(b"ImageC".to_vec())],
    );

    if !xobject_dict.is_empty() {
        let mut xobject_resources = Dictionary::new();
        for (key, value) in xobject_dict.iter() {
            xobject_resources.set(key.to_vec(), value.clone());
        }
        resources.set("XObject", Object::Dictionary(xobject_resources));
    }
    resources
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resources_list_xobjects() {
        let mut xobjects = Dictionary::new();
        xobjects.set("Im1", Object::Reference((4, 0)));

        let resources = page_resources(&xobjects);
        let xobject = resources.get(b"XObject").unwrap().as_dict().unwrap();
        assert_eq!(xobject.get(b"Im1").unwrap().as_reference().unwrap(), (4, 0));
        assert_eq!(resources.get(b"ProcSet").unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_no_xobject_entry_when_empty() {
        let resources = page_resources(&Dictionary::new());
        assert!(resources.get(b"XObject").is_err());
    }
}
