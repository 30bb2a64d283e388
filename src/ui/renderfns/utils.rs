/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Price with two decimals, e.g. `$1.50`; non-finite prices print as-is
pub fn format_price(price: f64) -> String {
  if price.is_finite() {
    format!("${:.2}", price)
  } else {
    format!("${}", price)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("crème brûlée", 8), "crème...");
  }

  #[test]
  fn test_format_price() {
    assert_eq!(format_price(1.5), "$1.50");
    assert_eq!(format_price(2.0), "$2.00");
    assert_eq!(format_price(f64::NAN), "$NaN");
  }
}
