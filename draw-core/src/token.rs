use rand::rngs::OsRng;
use rand::RngCore;

pub type Token = String;

/// Number of random bytes behind every token (128 bits).
pub const TOKEN_BYTES: usize = 16;

/// Draws a fresh capability token from the operating system CSPRNG.
pub fn try_new_token() -> Result<Token, rand::Error> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(hex::encode(bytes))
}

/// Like [`try_new_token`], but a broken random source takes the whole
/// process down. Tokens are bearer secrets, so there is no fallback.
pub fn new_token() -> Token {
    match try_new_token() {
        Ok(token) => token,
        Err(err) => {
            tracing::error!(error = %err, "secure random source unavailable, aborting");
            std::process::abort();
        }
    }
}
