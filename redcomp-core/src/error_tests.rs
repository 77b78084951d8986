#[cfg(test)]
mod tests {
    use crate::error::*;
    use std::io;

    #[test]
    fn test_parse_error() {
        let err = Error::Parse {
            position: 4,
            message: "expected ')'".to_string(),
        };
        assert_eq!(err.to_string(), "Parse error at offset 4: expected ')'");
    }

    #[test]
    fn test_unexpected_eof() {
        let err = Error::UnexpectedEof("x +".to_string());
        assert_eq!(err.to_string(), "Unexpected end of expression: x +");
    }

    #[test]
    fn test_invalid_port() {
        let err = Error::InvalidPort("C1.".to_string());
        assert_eq!(err.to_string(), "Invalid port reference: \"C1.\"");
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "model.json");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("model.json"));
    }

    #[test]
    fn test_json_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(err.to_string().starts_with("JSON error"));
    }
}
