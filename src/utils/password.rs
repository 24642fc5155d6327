use argon2::password_hash::rand_core::{OsRng, RngCore};

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"@$!%*?&";

pub const GENERATED_PASSWORD_LENGTH: usize = 16;

/// Uniform index in `0..n` without modulo bias.
fn pick<R: RngCore>(rng: &mut R, n: usize) -> usize {
    let n = n as u32;
    let zone = u32::MAX - (u32::MAX % n);
    loop {
        let v = rng.next_u32();
        if v < zone {
            return (v % n) as usize;
        }
    }
}

fn generate_with<R: RngCore>(rng: &mut R, length: usize) -> String {
    let classes = [LOWER, UPPER, DIGITS, SYMBOLS];
    let all: Vec<u8> = classes.concat();

    let mut chars: Vec<u8> = classes
        .iter()
        .map(|class| class[pick(rng, class.len())])
        .collect();
    while chars.len() < length {
        chars.push(all[pick(rng, all.len())]);
    }

    for i in (1..chars.len()).rev() {
        let j = pick(rng, i + 1);
        chars.swap(i, j);
    }

    chars.into_iter().map(char::from).collect()
}

/// Random password containing every character class the password rule
/// requires. `length` below four is raised to four.
pub fn generate_secure_password(length: usize) -> String {
    generate_with(&mut OsRng, length)
}
