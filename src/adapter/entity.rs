//! Entity written, read and queried by every scenario.

use std::hint::black_box;

use rand::Rng;
use rand::distributions::Alphanumeric;

const MAX_STRING_LEN: usize = 20;
const MAX_BYTES_LEN: usize = 32;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleEntity {
    /// Zero until the store assigns an id.
    pub id: u64,
    pub simple_boolean: bool,
    pub simple_byte: i8,
    pub simple_short: i16,
    pub simple_int: i32,
    pub simple_long: i64,
    pub simple_float: f32,
    pub simple_double: f64,
    pub simple_string: String,
    pub simple_byte_array: Vec<u8>,
}

impl SimpleEntity {
    /// New unsaved entity. With `scalars_only` the string and byte array
    /// fields stay empty.
    pub fn random<R: Rng>(rng: &mut R, scalars_only: bool) -> Self {
        let mut entity = SimpleEntity::default();
        if scalars_only {
            entity.randomize_scalars(rng);
        } else {
            entity.randomize(rng);
        }
        entity
    }

    pub fn randomize_scalars<R: Rng>(&mut self, rng: &mut R) {
        self.simple_boolean = rng.r#gen();
        self.simple_byte = rng.r#gen();
        self.simple_short = rng.r#gen();
        self.simple_int = rng.r#gen();
        self.simple_long = rng.r#gen();
        self.simple_float = rng.r#gen();
        self.simple_double = rng.r#gen();
    }

    pub fn randomize<R: Rng>(&mut self, rng: &mut R) {
        self.randomize_scalars(rng);
        self.simple_string = random_string(rng);
        self.simple_byte_array = random_bytes(rng);
    }
}

pub fn random_string<R: Rng>(rng: &mut R) -> String {
    let len = rng.gen_range(1..=MAX_STRING_LEN);
    (0..len).map(|_| rng.sample(Alphanumeric) as char).collect()
}

pub fn random_bytes<R: Rng>(rng: &mut R) -> Vec<u8> {
    let len = rng.gen_range(0..=MAX_BYTES_LEN);
    (0..len).map(|_| rng.r#gen()).collect()
}

/// Reads every field of every entity so loads cannot be optimized away.
pub fn access_all(entities: &[SimpleEntity]) {
    for entity in entities {
        black_box(entity.id);
        black_box(entity.simple_boolean);
        black_box(entity.simple_byte);
        black_box(entity.simple_short);
        black_box(entity.simple_int);
        black_box(entity.simple_long);
        black_box(entity.simple_float);
        black_box(entity.simple_double);
        black_box(entity.simple_string.as_str());
        black_box(entity.simple_byte_array.as_slice());
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_scalars_only_leaves_payload_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        let entity = SimpleEntity::random(&mut rng, true);
        assert!(entity.simple_string.is_empty());
        assert!(entity.simple_byte_array.is_empty());
        assert_eq!(entity.id, 0);
    }

    #[test]
    fn test_random_string_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let s = random_string(&mut rng);
            assert!((1..=MAX_STRING_LEN).contains(&s.len()));
            assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}
