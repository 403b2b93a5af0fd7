//! Deterministic checkpoint colors.
//!
//! A 128-bit hash of the text seeds a small-fast-counter generator, whose
//! first three outputs pick the red, green and blue channels. The same text
//! always yields the same color.

/// 128-bit string hash over UTF-16 code units
fn cyrb128(text: &str) -> [u32; 4] {
    let mut h1: u32 = 1_779_033_703;
    let mut h2: u32 = 3_144_134_277;
    let mut h3: u32 = 1_013_904_242;
    let mut h4: u32 = 2_773_480_762;

    for unit in text.encode_utf16() {
        let k = u32::from(unit);
        h1 = h2 ^ (h1 ^ k).wrapping_mul(597_399_067);
        h2 = h3 ^ (h2 ^ k).wrapping_mul(2_869_860_233);
        h3 = h4 ^ (h3 ^ k).wrapping_mul(951_274_213);
        h4 = h1 ^ (h4 ^ k).wrapping_mul(2_716_044_179);
    }

    h1 = (h3 ^ (h1 >> 18)).wrapping_mul(597_399_067);
    h2 = (h4 ^ (h2 >> 22)).wrapping_mul(2_869_860_233);
    h3 = (h1 ^ (h3 >> 17)).wrapping_mul(951_274_213);
    h4 = (h2 ^ (h4 >> 19)).wrapping_mul(2_716_044_179);
    h1 ^= h2 ^ h3 ^ h4;
    h2 ^= h1;
    h3 ^= h1;
    h4 ^= h1;

    [h1, h2, h3, h4]
}

/// Small fast counting generator
struct Sfc32 {
    a: u32,
    b: u32,
    c: u32,
    d: u32,
}

impl Sfc32 {
    fn new([a, b, c, d]: [u32; 4]) -> Self {
        Self { a, b, c, d }
    }

    fn next_u32(&mut self) -> u32 {
        let t = self.a.wrapping_add(self.b).wrapping_add(self.d);
        self.d = self.d.wrapping_add(1);
        self.a = self.b ^ (self.b >> 9);
        self.b = self.c.wrapping_add(self.c << 3);
        self.c = self.c.rotate_left(21).wrapping_add(t);
        t
    }

    /// One color channel: the top byte of the next output
    fn next_channel(&mut self) -> u8 {
        (self.next_u32() >> 24) as u8
    }
}

/// Color for a checkpoint, formatted as `rgb(r, g, b)`
pub fn seeded_color(text: &str) -> String {
    let mut rng = Sfc32::new(cyrb128(text));
    let r = rng.next_channel();
    let g = rng.next_channel();
    let b = rng.next_channel();
    format!("rgb({}, {}, {})", r, g, b)
}
