// ABOUTME: Integration tests for identifiers and image references.
// ABOUTME: Tests parsing, validation, and display properties.

use bondi::types::*;
use proptest::prelude::*;

mod image_ref_tests {
    use super::*;

    #[test]
    fn parse_name_with_tag() {
        let img = ImageRef::parse("nginx:1.25").unwrap();
        assert_eq!(img.name(), "nginx");
        assert_eq!(img.tag(), "1.25");
        assert!(img.has_tag());
    }

    #[test]
    fn parse_name_without_tag() {
        let img = ImageRef::parse("nginx").unwrap();
        assert_eq!(img.name(), "nginx");
        assert_eq!(img.tag(), "");
        assert!(!img.has_tag());
        assert_eq!(img.to_string(), "nginx");
    }

    #[test]
    fn parse_registry_path() {
        let img = ImageRef::parse("ghcr.io/acme/app:v1.2.3").unwrap();
        assert_eq!(img.name(), "ghcr.io/acme/app");
        assert_eq!(img.tag(), "v1.2.3");
    }

    #[test]
    fn registry_port_is_rejected() {
        assert_eq!(
            ImageRef::parse("registry:5000/app:v1"),
            Err(ParseImageRefError::TooManyColons(
                "registry:5000/app:v1".to_string()
            ))
        );
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(ImageRef::parse("   "), Err(ParseImageRefError::Empty));
    }

    #[test]
    fn missing_name_is_rejected() {
        assert!(matches!(
            ImageRef::parse(":v1"),
            Err(ParseImageRefError::EmptyName(_))
        ));
    }

    #[test]
    fn from_str_matches_parse() {
        let img: ImageRef = "traefik:v3.3.0".parse().unwrap();
        assert_eq!(img, ImageRef::new("traefik", "v3.3.0"));
    }
}

mod id_tests {
    use super::*;

    #[test]
    fn short_form_is_twelve_characters() {
        let id = ContainerId::new("0123456789abcdef0123");
        assert_eq!(id.short(), "0123456789ab");
        assert_eq!(id.as_str(), "0123456789abcdef0123");
    }

    #[test]
    fn short_form_of_short_id_is_itself() {
        let id = ImageId::new("abc");
        assert_eq!(id.short(), "abc");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = NetworkId::new("net1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"net1\"");
    }
}

proptest! {
    #[test]
    fn name_and_tag_survive_display(
        name in "[a-z][a-z0-9._/-]{0,30}",
        tag in "[A-Za-z0-9_][A-Za-z0-9_.-]{0,20}",
    ) {
        let img = ImageRef::new(name.clone(), tag.clone());
        let parsed = ImageRef::parse(&img.to_string()).unwrap();
        prop_assert_eq!(parsed.name(), name.as_str());
        prop_assert_eq!(parsed.tag(), tag.as_str());
    }

    #[test]
    fn parse_never_panics(input in ".*") {
        let _ = ImageRef::parse(&input);
    }
}
