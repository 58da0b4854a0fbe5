//! RC4 stream cipher (ARCFOUR), as used by PDF security handler
//! revisions 2 to 4.

use zeroize::Zeroize;

/// RC4 cipher state
pub struct Rc4 {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4 {
    /// Run the key schedule. Keys of 1 to 256 bytes are valid; PDF uses
    /// 5 to 16.
    pub fn new(key: &[u8]) -> Self {
        let mut s = [0u8; 256];
        for (i, byte) in s.iter_mut().enumerate() {
            *byte = i as u8;
        }

        if !key.is_empty() {
            let mut j = 0u8;
            for i in 0..256 {
                j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
                s.swap(i, j as usize);
            }
        }

        Self { s, i: 0, j: 0 }
    }

    /// Encrypt or decrypt in place (RC4 is symmetric)
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            self.i = self.i.wrapping_add(1);
            self.j = self.j.wrapping_add(self.s[self.i as usize]);
            self.s.swap(self.i as usize, self.j as usize);
            let k = self.s[self.s[self.i as usize].wrapping_add(self.s[self.j as usize]) as usize];
            *byte ^= k;
        }
    }

    /// Process a copy of `data`
    pub fn process(&mut self, data: &[u8]) -> Vec<u8> {
        let mut output = data.to_vec();
        self.apply_keystream(&mut output);
        output
    }
}

impl Drop for Rc4 {
    fn drop(&mut self) {
        self.s.zeroize();
    }
}

/// One-shot RC4 with a fresh key schedule
pub fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    Rc4::new(key).process(data)
}
