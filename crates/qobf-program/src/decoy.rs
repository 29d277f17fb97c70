//! Random identifiers and throwaway code for filled templates.

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Prefix used when a caller has no better one.
pub const DEFAULT_PREFIX: &str = "var";
/// Suffix length of [`identifier`] names.
pub const DEFAULT_SUFFIX_LEN: usize = 8;

/// A fresh identifier `<prefix>_<len alphanumerics>`.
///
/// The prefix keeps the name from starting with a digit, so the result is
/// always a valid Python identifier.
pub fn identifier<R: Rng + ?Sized>(rng: &mut R, prefix: &str, len: usize) -> String {
    let suffix: String = (0..len)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect();
    format!("{prefix}_{suffix}")
}

/// A small function that hashes a random number. It is never called; it
/// only sits next to the real code.
pub fn decoy_method<R: Rng + ?Sized>(rng: &mut R) -> String {
    let func = identifier(rng, "func", 6);
    let first = identifier(rng, "tmp", 4);
    let second = identifier(rng, "tmp", 4);
    format!(
        "def {func}():\n    {first} = random.randint(1, 999)\n    {second} = hashlib.sha256(str({first}).encode()).hexdigest()\n    return {second}[:8]"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_identifier_shape() {
        let mut rng = StdRng::seed_from_u64(11);
        let name = identifier(&mut rng, "res", 8);
        let (prefix, suffix) = name.split_once('_').unwrap();
        assert_eq!(prefix, "res");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_decoy_method_parses() {
        let mut rng = StdRng::seed_from_u64(4);
        let method = decoy_method(&mut rng);
        assert!(method.starts_with("def func_"));
        let module = qobf_script::parse(&method).unwrap();
        assert_eq!(module.body.len(), 1);
        assert!(matches!(module.body[0], qobf_script::Stmt::FunctionDef(_)));
    }
}
