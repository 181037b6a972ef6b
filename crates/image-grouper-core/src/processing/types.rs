/// Hash methods, their declared value shapes, and the distance functions
/// that consume them.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shape of the value a hash method produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashShape {
    /// A 64-bit fingerprint compared by Hamming distance
    Bits,
    /// A fixed-length vector of 0-255 components
    Vector { len: usize },
}

/// A computed perceptual hash
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashValue {
    Bits(u64),
    Vector(Vec<u8>),
}

impl HashValue {
    /// Hex form used by the persistent cache; bit hashes are big-endian
    pub fn to_hex(&self) -> String {
        match self {
            HashValue::Bits(bits) => hex::encode(bits.to_be_bytes()),
            HashValue::Vector(values) => hex::encode(values),
        }
    }

    /// Parse the hex form, interpreting it according to `shape`
    pub fn from_hex(text: &str, shape: HashShape) -> Option<Self> {
        let bytes = hex::decode(text).ok()?;
        match shape {
            HashShape::Bits => {
                let bytes: [u8; 8] = bytes.try_into().ok()?;
                Some(HashValue::Bits(u64::from_be_bytes(bytes)))
            }
            HashShape::Vector { len } if bytes.len() == len => Some(HashValue::Vector(bytes)),
            HashShape::Vector { .. } => None,
        }
    }

    pub fn matches_shape(&self, shape: HashShape) -> bool {
        match (self, shape) {
            (HashValue::Bits(_), HashShape::Bits) => true,
            (HashValue::Vector(v), HashShape::Vector { len }) => v.len() == len,
            _ => false,
        }
    }
}

/// Colour space a colour hash is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Hsv,
    Rgb,
    Luminosity,
}

impl ColorSpace {
    pub fn channels(self) -> usize {
        match self {
            ColorSpace::Hsv | ColorSpace::Rgb => 3,
            ColorSpace::Luminosity => 1,
        }
    }
}

/// Every perceptual hash the attribute provider knows how to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HashMethod {
    Horizontal,
    Vertical,
    Hsv,
    Hsv5,
    Rgb,
    Rgb5,
    Luminosity,
    Luminosity5,
}

impl HashMethod {
    pub const ALL: [HashMethod; 8] = [
        HashMethod::Horizontal,
        HashMethod::Vertical,
        HashMethod::Hsv,
        HashMethod::Hsv5,
        HashMethod::Rgb,
        HashMethod::Rgb5,
        HashMethod::Luminosity,
        HashMethod::Luminosity5,
    ];

    /// Display name, also the method key in the persistent cache
    pub fn name(self) -> &'static str {
        match self {
            HashMethod::Horizontal => "Horizontal",
            HashMethod::Vertical => "Vertical",
            HashMethod::Hsv => "HSV",
            HashMethod::Hsv5 => "HSV (5 regions)",
            HashMethod::Rgb => "RGB",
            HashMethod::Rgb5 => "RGB (5 regions)",
            HashMethod::Luminosity => "Luminosity",
            HashMethod::Luminosity5 => "Luminosity (5 regions)",
        }
    }

    /// Colour space and number of regions for the colour methods
    pub fn color_layout(self) -> Option<(ColorSpace, usize)> {
        match self {
            HashMethod::Horizontal | HashMethod::Vertical => None,
            HashMethod::Hsv => Some((ColorSpace::Hsv, 1)),
            HashMethod::Hsv5 => Some((ColorSpace::Hsv, 5)),
            HashMethod::Rgb => Some((ColorSpace::Rgb, 1)),
            HashMethod::Rgb5 => Some((ColorSpace::Rgb, 5)),
            HashMethod::Luminosity => Some((ColorSpace::Luminosity, 1)),
            HashMethod::Luminosity5 => Some((ColorSpace::Luminosity, 5)),
        }
    }

    pub fn shape(self) -> HashShape {
        match self.color_layout() {
            None => HashShape::Bits,
            // median and spread per channel per region
            Some((space, regions)) => HashShape::Vector {
                len: space.channels() * 2 * regions,
            },
        }
    }

    /// Distance between two values of this method.
    ///
    /// Bits: number of differing bits. Vectors: mean absolute difference of
    /// the components, where the hue median of HSV methods (every sixth
    /// component starting at 0) is measured around the colour wheel.
    /// Values of the wrong shape have no distance.
    pub fn distance(self, a: &HashValue, b: &HashValue) -> Option<f64> {
        let shape = self.shape();
        if !a.matches_shape(shape) || !b.matches_shape(shape) {
            return None;
        }
        match (a, b) {
            (HashValue::Bits(a), HashValue::Bits(b)) => Some((a ^ b).count_ones() as f64),
            (HashValue::Vector(a), HashValue::Vector(b)) => {
                if a.is_empty() {
                    return Some(0.0);
                }
                let cyclic_hue = matches!(self.color_layout(), Some((ColorSpace::Hsv, _)));
                let total: u32 = a
                    .iter()
                    .zip(b.iter())
                    .enumerate()
                    .map(|(i, (&x, &y))| {
                        if cyclic_hue && i % 6 == 0 {
                            hue_distance(x, y)
                        } else {
                            (x as i32 - y as i32).unsigned_abs()
                        }
                    })
                    .sum();
                Some(total as f64 / a.len() as f64)
            }
            _ => None,
        }
    }
}

/// Distance between two hues on the 0-255 colour wheel, where 255 sits next to 0
pub fn hue_distance(a: u8, b: u8) -> u32 {
    let forward = (a as i32 - b as i32).rem_euclid(256);
    let backward = (b as i32 - a as i32).rem_euclid(256);
    forward.min(backward) as u32
}

impl fmt::Display for HashMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashMethod {
    type Err = String;

    /// Accepts the display name or a short alias (`hsv5`, `luminosity`, ...)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if let Some(method) = HashMethod::ALL
            .iter()
            .find(|m| m.name().eq_ignore_ascii_case(wanted))
        {
            return Ok(*method);
        }
        match wanted.to_lowercase().as_str() {
            "horizontal" | "h" => Ok(HashMethod::Horizontal),
            "vertical" | "v" => Ok(HashMethod::Vertical),
            "hsv" => Ok(HashMethod::Hsv),
            "hsv5" => Ok(HashMethod::Hsv5),
            "rgb" => Ok(HashMethod::Rgb),
            "rgb5" => Ok(HashMethod::Rgb5),
            "luminosity" | "l" => Ok(HashMethod::Luminosity),
            "luminosity5" | "l5" => Ok(HashMethod::Luminosity5),
            other => Err(format!("unknown hash method '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hue_wraps_around() {
        assert_eq!(hue_distance(254, 2), 4);
        assert_eq!(hue_distance(2, 254), 4);
        assert_eq!(hue_distance(10, 20), 10);
        assert_eq!(hue_distance(0, 128), 128);
    }

    #[test]
    fn test_hsv_distance_uses_circular_hue() {
        let a = HashValue::Vector(vec![254, 0, 0, 0, 0, 0]);
        let b = HashValue::Vector(vec![2, 0, 0, 0, 0, 0]);
        // 4 on the hue component, averaged over six components
        assert_eq!(HashMethod::Hsv.distance(&a, &b), Some(4.0 / 6.0));
        // RGB has no cyclic component
        assert_eq!(HashMethod::Rgb.distance(&a, &b), Some(252.0 / 6.0));
    }

    #[test]
    fn test_only_every_sixth_component_is_cyclic() {
        let a = HashValue::Vector(vec![0, 254, 0, 0, 0, 0]);
        let b = HashValue::Vector(vec![0, 2, 0, 0, 0, 0]);
        assert_eq!(HashMethod::Hsv.distance(&a, &b), Some(252.0 / 6.0));
    }

    #[test]
    fn test_bit_distance() {
        let a = HashValue::Bits(0b1011);
        let b = HashValue::Bits(0b0001);
        assert_eq!(HashMethod::Horizontal.distance(&a, &b), Some(2.0));
    }

    #[test]
    fn test_shape_mismatch_has_no_distance() {
        let bits = HashValue::Bits(1);
        let short = HashValue::Vector(vec![1, 2, 3]);
        assert_eq!(HashMethod::Horizontal.distance(&bits, &short), None);
        assert_eq!(HashMethod::Hsv.distance(&short, &short), None);
    }

    #[test]
    fn test_declared_shapes() {
        assert_eq!(HashMethod::Vertical.shape(), HashShape::Bits);
        assert_eq!(HashMethod::Hsv.shape(), HashShape::Vector { len: 6 });
        assert_eq!(HashMethod::Rgb5.shape(), HashShape::Vector { len: 30 });
        assert_eq!(HashMethod::Luminosity5.shape(), HashShape::Vector { len: 10 });
    }

    #[test]
    fn test_hex_form() {
        let bits = HashValue::Bits(0xdead_beef);
        assert_eq!(bits.to_hex(), "00000000deadbeef");
        assert_eq!(HashValue::from_hex(&bits.to_hex(), HashShape::Bits), Some(bits));

        let vector = HashValue::Vector(vec![0, 15, 255]);
        assert_eq!(vector.to_hex(), "000fff");
        assert_eq!(
            HashValue::from_hex("000fff", HashShape::Vector { len: 3 }),
            Some(vector)
        );
        assert_eq!(HashValue::from_hex("000fff", HashShape::Vector { len: 4 }), None);
        assert_eq!(HashValue::from_hex("zz", HashShape::Vector { len: 1 }), None);
    }

    #[test]
    fn test_hex_rejects_signs_and_wrong_lengths() {
        assert_eq!(HashValue::from_hex("+00000000000000f", HashShape::Bits), None);
        assert_eq!(HashValue::from_hex("0f", HashShape::Bits), None);
        assert_eq!(HashValue::from_hex("000000000000000f00", HashShape::Bits), None);
        assert_eq!(
            HashValue::from_hex("000000000000000f", HashShape::Bits),
            Some(HashValue::Bits(15))
        );
    }

    #[test]
    fn test_parse_method_names() {
        assert_eq!("HSV (5 regions)".parse::<HashMethod>(), Ok(HashMethod::Hsv5));
        assert_eq!("hsv5".parse::<HashMethod>(), Ok(HashMethod::Hsv5));
        assert_eq!("vertical".parse::<HashMethod>(), Ok(HashMethod::Vertical));
        assert!("sobel".parse::<HashMethod>().is_err());
    }
}
