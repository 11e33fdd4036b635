/// Shared on-chain constants
pub mod mints {
    /// Wrapped SOL (native SOL wrapped as SPL token)
    pub const SOL: &str = "So11111111111111111111111111111111111111112";
}

/// Program IDs
pub mod programs {
    /// SPL Token Program
    pub const SPL_TOKEN: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
}

/// Lamports per SOL
pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Balance deltas below this magnitude (in SOL or token UI units) are noise
pub const DUST_THRESHOLD: f64 = 1e-6;
