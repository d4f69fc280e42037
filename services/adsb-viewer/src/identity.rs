//! Country of registration and synthesized registrations from ICAO addresses

use serde::Serialize;

/// Country owning an ICAO address block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryInfo {
    pub country: &'static str,
    /// Flag image file name, relative to the static flags directory
    pub flag_image: String,
}

/// National allocations: (first, last, country)
const ICAO_RANGES: &[(u32, u32, &str)] = &[
    (0x004000, 0x0043FF, "Zimbabwe"),
    (0x006000, 0x006FFF, "Mozambique"),
    (0x008000, 0x00FFFF, "South Africa"),
    (0x010000, 0x017FFF, "Egypt"),
    (0x018000, 0x01FFFF, "Libya"),
    (0x020000, 0x027FFF, "Morocco"),
    (0x028000, 0x02FFFF, "Tunisia"),
    (0x0D0000, 0x0D7FFF, "Mexico"),
    (0x0D8000, 0x0DFFFF, "Venezuela"),
    (0x100000, 0x1FFFFF, "Russia"),
    (0x300000, 0x33FFFF, "Italy"),
    (0x340000, 0x37FFFF, "Spain"),
    (0x380000, 0x3BFFFF, "France"),
    (0x3C0000, 0x3FFFFF, "Germany"),
    (0x400000, 0x43FFFF, "United Kingdom"),
    (0x440000, 0x447FFF, "Austria"),
    (0x448000, 0x44FFFF, "Belgium"),
    (0x450000, 0x457FFF, "Bulgaria"),
    (0x458000, 0x45FFFF, "Denmark"),
    (0x460000, 0x467FFF, "Finland"),
    (0x468000, 0x46FFFF, "Greece"),
    (0x470000, 0x477FFF, "Hungary"),
    (0x478000, 0x47FFFF, "Norway"),
    (0x480000, 0x487FFF, "Netherlands"),
    (0x488000, 0x48FFFF, "Poland"),
    (0x490000, 0x497FFF, "Portugal"),
    (0x498000, 0x49FFFF, "Czechia"),
    (0x4A0000, 0x4A7FFF, "Romania"),
    (0x4A8000, 0x4AFFFF, "Sweden"),
    (0x4B0000, 0x4B7FFF, "Switzerland"),
    (0x4B8000, 0x4BFFFF, "Turkey"),
    (0x4C0000, 0x4C7FFF, "Serbia"),
    (0x4CA000, 0x4CAFFF, "Ireland"),
    (0x4CC000, 0x4CCFFF, "Iceland"),
    (0x700000, 0x700FFF, "Afghanistan"),
    (0x710000, 0x717FFF, "Saudi Arabia"),
    (0x718000, 0x71FFFF, "South Korea"),
    (0x738000, 0x73FFFF, "Israel"),
    (0x780000, 0x7BFFFF, "China"),
    (0x7C0000, 0x7FFFFF, "Australia"),
    (0x800000, 0x83FFFF, "India"),
    (0x840000, 0x87FFFF, "Japan"),
    (0x880000, 0x887FFF, "Thailand"),
    (0x896000, 0x896FFF, "United Arab Emirates"),
    (0x8A0000, 0x8A7FFF, "Indonesia"),
    (0xA00000, 0xAFFFFF, "United States"),
    (0xC00000, 0xC3FFFF, "Canada"),
    (0xC80000, 0xC87FFF, "New Zealand"),
    (0xE00000, 0xE3FFFF, "Argentina"),
    (0xE40000, 0xE7FFFF, "Brazil"),
    (0xE80000, 0xE80FFF, "Chile"),
];

/// Country the address block is allocated to
pub fn country_for(icao: u32) -> Option<CountryInfo> {
    ICAO_RANGES
        .iter()
        .find(|(first, last, _)| (*first..=*last).contains(&icao))
        .map(|(_, _, country)| CountryInfo {
            country,
            flag_image: format!("{}.png", country.replace(' ', "_")),
        })
}

/// Suffix letters; I and O are never issued
const LIMITED_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";

const US_FIRST: u32 = 0xA00001;
const US_COUNT: u32 = 915_399;

// Size of the address block below each registration prefix length
const BUCKET_DIGIT1: u32 = 101_711;
const BUCKET_DIGIT2: u32 = 10_111;
const BUCKET_DIGIT3: u32 = 951;
const BUCKET_DIGIT4: u32 = 35;
/// Addresses used by the up-to-two-letter suffixes after a digit
const LETTER_SUFFIXES: u32 = 601;

fn letter(index: u32) -> Option<char> {
    LIMITED_ALPHABET.get(index as usize).map(|b| char::from(*b))
}

/// Zero, one or two suffix letters
fn two_letters(rem: u32) -> String {
    if rem == 0 {
        return String::new();
    }
    let rem = rem - 1;
    let mut out = String::new();
    out.extend(letter(rem / 25));
    let second = rem % 25;
    if second > 0 {
        out.extend(letter(second - 1));
    }
    out
}

fn one_letter(rem: u32) -> String {
    if rem == 0 {
        String::new()
    } else {
        letter(rem - 1).map(String::from).unwrap_or_default()
    }
}

/// US civil registration (N-number) encoded in the address, if any
pub fn n_number_registration(icao: u32) -> Option<String> {
    if !(US_FIRST..US_FIRST + US_COUNT).contains(&icao) {
        return None;
    }
    let mut offset = icao - US_FIRST;

    let mut reg = format!("N{}", offset / BUCKET_DIGIT1 + 1);
    offset %= BUCKET_DIGIT1;
    if offset < LETTER_SUFFIXES {
        return Some(reg + &two_letters(offset));
    }

    offset -= LETTER_SUFFIXES;
    reg += &(offset / BUCKET_DIGIT2).to_string();
    offset %= BUCKET_DIGIT2;
    if offset < LETTER_SUFFIXES {
        return Some(reg + &two_letters(offset));
    }

    offset -= LETTER_SUFFIXES;
    reg += &(offset / BUCKET_DIGIT3).to_string();
    offset %= BUCKET_DIGIT3;
    if offset < LETTER_SUFFIXES {
        return Some(reg + &two_letters(offset));
    }

    offset -= LETTER_SUFFIXES;
    reg += &(offset / BUCKET_DIGIT4).to_string();
    offset %= BUCKET_DIGIT4;
    if offset <= LIMITED_ALPHABET.len() as u32 {
        return Some(reg + &one_letter(offset));
    }

    // final position is a digit
    offset -= LIMITED_ALPHABET.len() as u32 + 1;
    Some(reg + &offset.to_string())
}
