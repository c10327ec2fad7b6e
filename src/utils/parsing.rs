/// Parse de algo como: [1, 3, 224, 224]
pub fn parse_usize_list(text: &str) -> Result<Vec<usize>, String> {
    let inner = strip_brackets(text, "[d1, d2, ...]")?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|part| {
            let p = part.trim();
            p.parse().map_err(|_| format!("Invalid dimension: {}", p))
        })
        .collect()
}

/// Parse de algo como: [1, 0, -2.5] a Vec<f32>
pub fn parse_f32_list(text: &str) -> Result<Vec<f32>, String> {
    let inner = strip_brackets(text, "[v1, v2, ...]")?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner.split(',').map(|part| parse_f32(part.trim())).collect()
}

/// A single finite float
pub fn parse_f32(text: &str) -> Result<f32, String> {
    let v: f32 = text
        .trim()
        .parse()
        .map_err(|_| format!("Invalid float: {}", text.trim()))?;
    if !v.is_finite() {
        return Err(format!("Value must be finite: {}", text.trim()));
    }
    Ok(v)
}

/// Split "<head> [ ... ] <tail>" at the first bracketed list: returns the list
/// (brackets included) and the trimmed remainder after it.
pub fn split_bracketed(text: &str) -> Result<(&str, &str), String> {
    let text = text.trim();
    if !text.starts_with('[') {
        return Err(format!("Expected [...], got: {}", text));
    }
    let end = text
        .find(']')
        .ok_or_else(|| format!("Unclosed bracket in: {}", text))?;
    Ok((&text[..=end], text[end + 1..].trim()))
}

fn strip_brackets<'a>(text: &'a str, expected: &str) -> Result<&'a str, String> {
    let inner = text.trim();
    if !inner.starts_with('[') || !inner.ends_with(']') {
        return Err(format!("Expected {}, got: {}", expected, text));
    }
    Ok(&inner[1..inner.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists() {
        assert_eq!(parse_usize_list("[1, 3, 32, 32]").unwrap(), vec![1, 3, 32, 32]);
        assert_eq!(parse_usize_list("[]").unwrap(), Vec::<usize>::new());
        assert!(parse_usize_list("1, 2").is_err());
        assert!(parse_usize_list("[1, -2]").is_err());
        assert_eq!(parse_f32_list("[1, -2.5, 0]").unwrap(), vec![1.0, -2.5, 0.0]);
        assert!(parse_f32_list("[1, inf]").is_err());
    }

    #[test]
    fn test_split_bracketed() {
        assert_eq!(
            split_bracketed("[2, 3] VALUES [1]").unwrap(),
            ("[2, 3]", "VALUES [1]")
        );
        assert!(split_bracketed("2, 3]").is_err());
        assert!(split_bracketed("[2, 3").is_err());
    }
}
