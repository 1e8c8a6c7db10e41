/// Bit length of issued nonces.
pub const LARGE_NONCE: usize = 80;

/// SHA-256 output length.
pub const CHALLENGE_BIT_LEN: usize = 256;

/// Redraws allowed when a fresh nonce collides with a known one.
pub const MAX_NONCE_DRAWS: usize = 16;

/// Consumed nonces remembered per registry for redraw checks.
pub const MAX_CONSUMED_NONCES: usize = 65_536;

/// Candidates tried when searching for the prime `e`.
pub const MAX_PRIME_CANDIDATES: usize = 100_000;

/// Miller-Rabin rounds when checking an `e` received from the issuer.
pub const E_PRIMALITY_CHECKS: i32 = 64;
