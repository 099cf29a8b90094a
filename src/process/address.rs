// src/process/address.rs

/// Join address parts with single spaces, keeping order. Missing parts
/// contribute an empty string, so runs of spaces are expected.
pub fn format_address<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    parts
        .into_iter()
        .map(|p| p.unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_component_leaves_double_space() {
        let parts = [
            Some("100 Main St"),
            Some(""),
            Some("Harrisburg"),
            Some("PA"),
            Some("17101"),
        ];
        assert_eq!(format_address(parts), "100 Main St  Harrisburg PA 17101");
    }

    #[test]
    fn missing_component_matches_empty_one() {
        let with_none = [Some("1 Elm"), None, Some("Erie")];
        let with_empty = [Some("1 Elm"), Some(""), Some("Erie")];
        assert_eq!(format_address(with_none), format_address(with_empty));
        assert_eq!(format_address([None, None]), " ");
    }
}
