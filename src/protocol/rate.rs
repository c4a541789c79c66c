//! Rate profiles
//!
//! Each profile fixes the voice frame width and the RATEP request that puts
//! the chip in that mode. The table is static and total.

use super::{CONTROL_RATEP, START_BYTE, TYPE_CONTROL};
use serde::{Deserialize, Serialize};

/// Length of every rate request (header + subtype + six rate control words)
pub const RATEP_REQUEST_LEN: usize = 17;

/// Named codec configuration (bit rate x FEC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateProfile {
    /// No configuration, leaves the chip untouched
    #[default]
    None,
    /// 3600 bit/s with FEC, 2400 voice (D-Star)
    #[serde(rename = "3600x2400")]
    Rate3600x2400,
    /// 3600 bit/s with FEC, 2450 voice (DMR, dPMR, YSF V/D type 1)
    #[serde(rename = "3600x2450")]
    Rate3600x2450,
    /// 7200 bit/s with FEC, 4400 voice (YSF V/D type 2)
    #[serde(rename = "7200x4400")]
    Rate7200x4400,
    /// 7100 bit/s with FEC, 4400 voice
    #[serde(rename = "7100x4400")]
    Rate7100x4400,
    /// 2450 bit/s, no FEC
    #[serde(rename = "2450")]
    Rate2450,
    /// 4400 bit/s, no FEC
    #[serde(rename = "4400")]
    Rate4400,
    /// 3000 bit/s, no FEC
    #[serde(rename = "3000")]
    Rate3000,
    /// 6400 bit/s, no FEC
    #[serde(rename = "6400")]
    Rate6400,
    /// 7200 bit/s, no FEC
    #[serde(rename = "7200")]
    Rate7200,
}

impl RateProfile {
    /// Every profile, `None` first
    pub const ALL: [RateProfile; 10] = [
        Self::None,
        Self::Rate3600x2400,
        Self::Rate3600x2450,
        Self::Rate7200x4400,
        Self::Rate7100x4400,
        Self::Rate2450,
        Self::Rate4400,
        Self::Rate3000,
        Self::Rate6400,
        Self::Rate7200,
    ];

    /// Voice frame width in bits
    pub fn voice_bits(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Rate3600x2400 | Self::Rate3600x2450 => 72,
            Self::Rate7200x4400 | Self::Rate7200 => 144,
            Self::Rate7100x4400 => 142,
            Self::Rate2450 => 49,
            Self::Rate4400 => 88,
            Self::Rate3000 => 60,
            Self::Rate6400 => 128,
        }
    }

    /// Voice frame width in bytes (bits rounded up to whole bytes)
    pub fn voice_bytes(self) -> u16 {
        match self {
            Self::None => 0,
            Self::Rate3600x2400 | Self::Rate3600x2450 => 9,
            Self::Rate7200x4400 | Self::Rate7100x4400 | Self::Rate7200 => 18,
            Self::Rate2450 => 7,
            Self::Rate4400 => 11,
            Self::Rate3000 => 8,
            Self::Rate6400 => 16,
        }
    }

    /// Rate control words, big-endian, as sent after the RATEP subtype
    fn control_words(self) -> Option<[u8; 12]> {
        let words = match self {
            Self::None => return None,
            Self::Rate3600x2400 => [
                0x01, 0x30, 0x07, 0x63, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x48,
            ],
            Self::Rate3600x2450 => [
                0x04, 0x31, 0x07, 0x54, 0x24, 0x00, 0x00, 0x00, 0x00, 0x00, 0x6F, 0x48,
            ],
            Self::Rate7200x4400 => [
                0x00, 0x58, 0x08, 0x87, 0x30, 0x03, 0x00, 0x00, 0x00, 0x00, 0x44, 0x90,
            ],
            Self::Rate7100x4400 => [
                0x00, 0x58, 0x08, 0x6B, 0x10, 0x30, 0x00, 0x00, 0x00, 0x00, 0x01, 0x90,
            ],
            Self::Rate2450 => [
                0x04, 0x31, 0x07, 0x54, 0x24, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            ],
            Self::Rate4400 => [
                0x00, 0x58, 0x08, 0x87, 0x30, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            ],
            Self::Rate3000 => [
                0x05, 0x58, 0x08, 0x68, 0x12, 0x20, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            ],
            Self::Rate6400 => [
                0x05, 0x58, 0x08, 0x80, 0x30, 0x30, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            ],
            Self::Rate7200 => [
                0x05, 0x58, 0x08, 0x90, 0x32, 0x30, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            ],
        };
        Some(words)
    }

    /// Literal RATEP request for this profile, `None` for [`RateProfile::None`]
    pub fn request(self) -> Option<[u8; RATEP_REQUEST_LEN]> {
        let words = self.control_words()?;
        let mut req = [0u8; RATEP_REQUEST_LEN];
        req[..5].copy_from_slice(&[START_BYTE, 0x00, 0x0D, TYPE_CONTROL, CONTROL_RATEP]);
        req[5..].copy_from_slice(&words);
        Some(req)
    }

    /// Profile for a format index of the test harness
    ///
    /// Indices 5, 8, 12 and 13 (2400, 2200, 8000 and 9600 bit/s without FEC)
    /// have frame widths outside 7-18 bytes and are not driven.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::None),
            1 => Some(Self::Rate3600x2400),
            2 => Some(Self::Rate3600x2450),
            3 => Some(Self::Rate7200x4400),
            4 => Some(Self::Rate7100x4400),
            6 => Some(Self::Rate2450),
            7 => Some(Self::Rate4400),
            9 => Some(Self::Rate3000),
            10 => Some(Self::Rate6400),
            11 => Some(Self::Rate7200),
            _ => None,
        }
    }
}

/// Voice frame width in bytes for `rate`
pub fn get_nb_mbe_bytes(rate: RateProfile) -> u16 {
    rate.voice_bytes()
}

/// Voice frame width in bits for `rate`
pub fn get_nb_mbe_bits(rate: RateProfile) -> u8 {
    rate.voice_bits()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::VOICE_FRAME_MAX_BYTES;

    #[test]
    fn test_bytes_hold_bits() {
        for rate in RateProfile::ALL {
            let bits = rate.voice_bits() as u16;
            assert_eq!(rate.voice_bytes(), bits.div_ceil(8), "{:?}", rate);
            assert!(rate.voice_bytes() as usize <= VOICE_FRAME_MAX_BYTES);
        }
    }

    #[test]
    fn test_widest_profile_fills_frame_buffer() {
        let widest = RateProfile::ALL
            .iter()
            .map(|r| r.voice_bytes() as usize)
            .max();
        assert_eq!(widest, Some(VOICE_FRAME_MAX_BYTES));
    }

    #[test]
    fn test_known_widths() {
        assert_eq!(get_nb_mbe_bits(RateProfile::Rate3600x2450), 72);
        assert_eq!(get_nb_mbe_bytes(RateProfile::Rate3600x2450), 9);
        assert_eq!(get_nb_mbe_bytes(RateProfile::Rate7200x4400), 18);
        assert_eq!(get_nb_mbe_bytes(RateProfile::Rate2450), 7);
        assert_eq!(get_nb_mbe_bytes(RateProfile::Rate4400), 11);
        assert_eq!(get_nb_mbe_bits(RateProfile::Rate3000), 60);
        assert_eq!(get_nb_mbe_bytes(RateProfile::Rate3000), 8);
        assert_eq!(get_nb_mbe_bits(RateProfile::Rate6400), 128);
        assert_eq!(get_nb_mbe_bytes(RateProfile::Rate6400), 16);
        assert_eq!(get_nb_mbe_bits(RateProfile::Rate7200), 144);
        assert_eq!(get_nb_mbe_bytes(RateProfile::Rate7200), 18);
        assert_eq!(get_nb_mbe_bits(RateProfile::None), 0);
        assert_eq!(get_nb_mbe_bytes(RateProfile::None), 0);
    }

    #[test]
    fn test_width_range() {
        for rate in &RateProfile::ALL[1..] {
            assert!((7..=18).contains(&rate.voice_bytes()), "{:?}", rate);
        }
    }

    #[test]
    fn test_request_layout() {
        assert!(RateProfile::None.request().is_none());

        for rate in &RateProfile::ALL[1..] {
            let req = rate.request().unwrap();
            assert_eq!(req[0], START_BYTE);
            // Declared length covers subtype + 12 control bytes
            assert_eq!(u16::from_be_bytes([req[1], req[2]]) as usize, req.len() - 4);
            assert_eq!(req[3], TYPE_CONTROL);
            assert_eq!(req[4], CONTROL_RATEP);
        }
    }

    #[test]
    fn test_requests_distinct() {
        let reqs: Vec<_> = RateProfile::ALL[1..]
            .iter()
            .map(|r| r.request().unwrap())
            .collect();
        for (i, a) in reqs.iter().enumerate() {
            for b in &reqs[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_from_index() {
        assert_eq!(RateProfile::from_index(0), Some(RateProfile::None));
        assert_eq!(RateProfile::from_index(2), Some(RateProfile::Rate3600x2450));
        assert_eq!(RateProfile::from_index(7), Some(RateProfile::Rate4400));
        assert_eq!(RateProfile::from_index(9), Some(RateProfile::Rate3000));
        assert_eq!(RateProfile::from_index(10), Some(RateProfile::Rate6400));
        assert_eq!(RateProfile::from_index(11), Some(RateProfile::Rate7200));
        for unsupported in [5, 8, 12, 13, 14] {
            assert_eq!(RateProfile::from_index(unsupported), None);
        }
    }

    #[test]
    fn test_rate_toml_names() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            rate: RateProfile,
        }

        let w: Wrapper = toml::from_str("rate = \"3600x2450\"").unwrap();
        assert_eq!(w.rate, RateProfile::Rate3600x2450);

        let w: Wrapper = toml::from_str("rate = \"6400\"").unwrap();
        assert_eq!(w.rate, RateProfile::Rate6400);

        let none = toml::to_string(&Wrapper {
            rate: RateProfile::None,
        })
        .unwrap();
        assert!(none.contains("rate = \"none\""));
    }
}
