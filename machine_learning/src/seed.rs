use rand::{SeedableRng, rngs::StdRng};

// Per-stream keys, mixed into the user seed so the three generators never share state.
const GENERAL_KEY: u64 = 0x9e37_79b9_7f4a_7c15;
const ARRAY_KEY: u64 = 0xbf58_476d_1ce4_e5b9;
const TENSOR_KEY: u64 = 0x94d0_49bb_1331_11eb;

/// A bank of independent, deterministically seeded random number generators.
///
/// Replaces process-wide RNG state: every consumer of randomness borrows the stream
/// it needs from a `Seeds` value, so two banks built from the same integer always
/// produce the same draws.
#[derive(Debug, Clone)]
pub struct Seeds {
    seed: u64,
    general: StdRng,
    array: StdRng,
    tensor: StdRng,
}

impl Seeds {
    /// Creates a new `Seeds` bank.
    ///
    /// # Arguments
    /// * `seed` - The integer every stream is derived from.
    ///
    /// # Returns
    /// A new `Seeds` instance.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            general: Self::stream(seed, GENERAL_KEY),
            array: Self::stream(seed, ARRAY_KEY),
            tensor: Self::stream(seed, TENSOR_KEY),
        }
    }

    /// Resets every stream to the state `Seeds::new(seed)` would produce.
    ///
    /// # Arguments
    /// * `seed` - The new seed.
    pub fn reseed(&mut self, seed: u64) {
        *self = Self::new(seed);
    }

    /// Returns the integer this bank was seeded with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The general purpose stream.
    pub fn general(&mut self) -> &mut StdRng {
        &mut self.general
    }

    /// The stream used for numeric array draws, such as synthetic datasets.
    pub fn array(&mut self) -> &mut StdRng {
        &mut self.array
    }

    /// The stream used for initializing model parameters.
    pub fn tensor(&mut self) -> &mut StdRng {
        &mut self.tensor
    }

    fn stream(seed: u64, key: u64) -> StdRng {
        StdRng::seed_from_u64(seed ^ key)
    }
}
