//! Display helpers shared by the history view and the command shell.

use soldash_types::Address;

/// Keep the first and last `keep` characters of `s`, joined by `...`.
///
/// Strings too short to shorten are returned unchanged.
pub fn abbreviate(s: &str, keep: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= keep * 2 + 3 {
        return s.to_string();
    }
    let head: String = chars[..keep].iter().collect();
    let tail: String = chars[chars.len() - keep..].iter().collect();
    format!("{head}...{tail}")
}

/// `7xKX...gAsU` form of an address.
pub fn abbreviate_address(address: &Address) -> String {
    abbreviate(address.as_str(), 4)
}
