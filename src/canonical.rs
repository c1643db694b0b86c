//! Canonicalization tables for state and district names.
//!
//! Every rewrite is an explicit entry. Lookups happen after whitespace
//! normalization (trim, non-breaking spaces to spaces, runs collapsed), so
//! keys are written in that normalized form. Alias targets are themselves
//! canonical, which makes [`canonicalize`] idempotent.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// The 28 states and 8 union territories.
pub const CANONICAL_STATES: [&str; 36] = [
    "Andaman & Nicobar Islands",
    "Andhra Pradesh",
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Chandigarh",
    "Chhattisgarh",
    "Dadra & Nagar Haveli and Daman & Diu",
    "Delhi",
    "Goa",
    "Gujarat",
    "Haryana",
    "Himachal Pradesh",
    "Jammu and Kashmir",
    "Jharkhand",
    "Karnataka",
    "Kerala",
    "Ladakh",
    "Lakshadweep",
    "Madhya Pradesh",
    "Maharashtra",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Odisha",
    "Puducherry",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tamil Nadu",
    "Telangana",
    "Tripura",
    "Uttar Pradesh",
    "Uttarakhand",
    "West Bengal",
];

/// Which column a name came from. Districts are resolved within their
/// (already canonical) state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind<'a> {
    State,
    District { state: &'a str },
}

/// `None` values mark entries that are not a geography at all.
static STATE_ALIASES: Lazy<HashMap<&'static str, Option<&'static str>>> = Lazy::new(|| {
    let dnhdd = Some("Dadra & Nagar Haveli and Daman & Diu");
    let an = Some("Andaman & Nicobar Islands");
    HashMap::from([
        ("Orissa", Some("Odisha")),
        ("WESTBENGAL", Some("West Bengal")),
        ("Westbengal", Some("West Bengal")),
        ("West Bangal", Some("West Bengal")),
        ("West Bengli", Some("West Bengal")),
        ("Chhatisgarh", Some("Chhattisgarh")),
        ("Tamilnadu", Some("Tamil Nadu")),
        ("Jammu And Kashmir", Some("Jammu and Kashmir")),
        ("Jammu & Kashmir", Some("Jammu and Kashmir")),
        ("Uttaranchal", Some("Uttarakhand")),
        ("Pondicherry", Some("Puducherry")),
        ("Andaman and Nicobar Islands", an),
        ("Andaman & Nicobar", an),
        ("A & N Islands", an),
        ("Dadra & Nagar Haveli", dnhdd),
        ("Daman & Diu", dnhdd),
        ("Dadra and Nagar Haveli", dnhdd),
        ("Daman and Diu", dnhdd),
        ("The Dadra And Nagar Haveli And Daman And Diu", dnhdd),
        ("Dadra and Nagar Haveli and Daman and Diu", dnhdd),
        ("NCT of Delhi", Some("Delhi")),
        ("New Delhi", Some("Delhi")),
        // localities recorded in the state column
        ("BALANAGAR", Some("Telangana")),
        ("Darbhanga", Some("Bihar")),
        ("Jaipur", Some("Rajasthan")),
        ("Madanapalle", Some("Andhra Pradesh")),
        ("Nagpur", Some("Maharashtra")),
        ("Puttenahalli", Some("Karnataka")),
        ("Raja Annamalai Puram", Some("Tamil Nadu")),
        ("100000", None),
    ])
});

/// Lower-cased canonical state -> canonical spelling.
static STATES_BY_LOWER: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    CANONICAL_STATES
        .iter()
        .map(|s| (s.to_lowercase(), *s))
        .collect()
});

/// District rewrites that are safe in any state.
static DISTRICT_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Nicobars", "Nicobar"),
        // Andhra Pradesh / Telangana
        ("Ananthapur", "Anantapur"),
        ("Ananthapuramu", "Anantapur"),
        ("chittoor", "Chittoor"),
        ("K.v. Rangareddy", "K.V.Rangareddy"),
        ("Karim Nagar", "Karimnagar"),
        ("Mahabub Nagar", "Mahbubnagar"),
        ("Mahabubnagar", "Mahbubnagar"),
        ("rangareddi", "Rangareddi"),
        ("Visakhapatanam", "Visakhapatnam"),
        ("Jangoan", "Jangaon"),
        ("Medchal-malkajgiri", "Medchal Malkajgiri"),
        ("Medchal?malkajgiri", "Medchal Malkajgiri"),
        ("Medchal\u{e2}\u{88}\u{92}malkajgiri", "Medchal Malkajgiri"),
        ("Medchal\u{2212}malkajgiri", "Medchal Malkajgiri"),
        ("Rangareddy", "Ranga Reddy"),
        ("Warangal Urban", "Warangal (urban)"),
        // Assam
        ("Sivasagar", "Sibsagar"),
        // Bihar
        ("Aurangabad(BH)", "Aurangabad"),
        ("Aurangabad(bh)", "Aurangabad"),
        ("Pashchim Champaran", "West Champaran"),
        ("Purba Champaran", "East Champaran"),
        ("Purbi Champaran", "East Champaran"),
        ("Purnia", "Purnea"),
        ("Samstipur", "Samastipur"),
        ("Sheikpura", "Sheikhpura"),
        // Chhattisgarh
        ("Gaurella Pendra Marwahi", "Gaurela-pendra-marwahi"),
        ("Janjgir Champa", "Janjgir - Champa"),
        ("Janjgir-champa", "Janjgir - Champa"),
        ("Manendragarh\u{2013}Chirmiri\u{2013}Bharatpur", "ManendragarhChirmiriBharatpur"),
        ("Mohla-Manpur-Ambagarh Chouki", "Mohalla-Manpur-Ambagarh Chowki"),
        // Dadra & Nagar Haveli and Daman & Diu
        ("Dadra And Nagar Haveli", "Dadra & Nagar Haveli"),
        ("Dadra and Nagar Haveli", "Dadra & Nagar Haveli"),
        // Delhi
        ("North East *", "North East"),
        // Gujarat
        ("Ahmedabad", "Ahmadabad"),
        ("Banaskantha", "Banas Kantha"),
        ("Panchmahals", "Panch Mahals"),
        ("Sabarkantha", "Sabar Kantha"),
        ("Surendranagar", "Surendra Nagar"),
        // Haryana
        ("Jhajjar *", "Jhajjar"),
        ("Yamunanagar", "Yamuna Nagar"),
        // Himachal Pradesh
        ("Lahul & Spiti", "Lahaul and Spiti"),
        ("Lahul and Spiti", "Lahaul and Spiti"),
        // Jammu and Kashmir
        ("Budgam", "Badgam"),
        ("Bandipur", "Bandipore"),
        ("punch", "Punch"),
        ("Rajouri", "Rajauri"),
        ("udhampur", "Udhampur"),
        // Jharkhand
        ("Bokaro *", "Bokaro"),
        ("East Singhbum", "East Singhbhum"),
        ("Purbi Singhbhum", "East Singhbhum"),
        ("Pashchimi Singhbhum", "West Singhbhum"),
        ("Garhwa *", "Garhwa"),
        ("Hazaribagh", "Hazaribag"),
        ("Koderma", "Kodarma"),
        ("Pakur", "Pakaur"),
        ("Palamu", "Palamau"),
        ("Sahibganj", "Sahebganj"),
        ("Seraikela-kharsawan", "Seraikela-Kharsawan"),
        // Karnataka
        ("Bagalkot *", "Bagalkot"),
        ("Chamarajanagar *", "Chamarajanagar"),
        ("Chamrajanagar", "Chamarajanagar"),
        ("Chamrajnagar", "Chamarajanagar"),
        ("Chikkamagaluru", "Chickmagalur"),
        ("Chikmagalur", "Chickmagalur"),
        ("Davangere", "Davanagere"),
        ("Gadag *", "Gadag"),
        ("Hassan", "Hasan"),
        ("Haveri *", "Haveri"),
        ("Ramanagara", "Ramanagar"),
        ("Shivamogga", "Shimoga"),
        ("Tumkur", "Tumakuru"),
        ("Udupi *", "Udupi"),
        ("yadgir", "Yadgir"),
        // Kerala
        ("Kasargod", "Kasaragod"),
        // Madhya Pradesh
        ("Ashoknagar", "Ashok Nagar"),
        ("Harda *", "Harda"),
        ("Narsinghpur", "Narsimhapur"),
        // Maharashtra
        ("Ahmed Nagar", "Ahmadnagar"),
        ("Ahmednagar", "Ahmadnagar"),
        ("Buldhana", "Buldana"),
        ("Chhatrapati Sambhajinagar", "Chatrapati Sambhaji Nagar"),
        ("Gondiya", "Gondia"),
        ("Hingoli *", "Hingoli"),
        ("Mumbai( Sub Urban )", "Mumbai Suburban"),
        ("Nandurbar *", "Nandurbar"),
        ("Washim *", "Washim"),
        // Mizoram
        ("Mammit", "Mamit"),
        // Odisha
        ("ANGUL", "Angul"),
        ("ANUGUL", "Angul"),
        ("Anugul", "Angul"),
        ("BALANGIR", "Balangir"),
        ("Baleswar", "Baleshwar"),
        ("Bhadrak(R)", "Bhadrak"),
        ("JAJPUR", "Jajpur"),
        ("Jajapur", "Jajpur"),
        ("jajpur", "Jajpur"),
        ("Jagatsinghpur", "Jagatsinghapur"),
        ("Kendrapara *", "Kendrapara"),
        ("Khordha", "Khorda"),
        ("NAYAGARH", "Nayagarh"),
        ("NUAPADA", "Nuapada"),
        ("Nabarangpur", "Nabarangapur"),
        ("Sundergarh", "Sundargarh"),
        // Punjab
        ("Firozpur", "Ferozepur"),
        ("SAS Nagar (Mohali)", "S.A.S Nagar(Mohali)"),
        // Rajasthan
        ("Chittorgarh", "Chittaurgarh"),
        ("Jalore", "Jalor"),
        ("Jhunjhunun", "Jhunjhunu"),
        // Tamil Nadu
        ("Kanchipuram", "Kancheepuram"),
        ("Kanyakumari", "Kanniyakumari"),
        ("Tiruvallur", "Thiruvallur"),
        ("Tirupattur", "Tirupathur"),
        ("Viluppuram", "Villupuram"),
        // Uttar Pradesh
        ("Auraiya *", "Auraiya"),
        ("Baghpat *", "Baghpat"),
        ("Bagpat", "Baghpat"),
        ("Barabanki", "Bara Banki"),
        ("Bulandshahr", "Bulandshahar"),
        ("Chandauli *", "Chandauli"),
        ("Chitrakoot *", "Chitrakoot"),
        ("Gautam Buddha Nagar *", "Gautam Buddha Nagar"),
        ("Jyotiba Phule Nagar *", "Jyotiba Phule Nagar"),
        ("Kushinagar", "Kushi Nagar"),
        ("Kushinagar *", "Kushi Nagar"),
        ("Mahrajganj", "Maharajganj"),
        ("Mahoba *", "Mahoba"),
        ("Raebareli", "Rae Bareli"),
        ("Sant Ravidas Nagar Bhadohi", "Sant Ravidas Nagar"),
        ("Shrawasti", "Shravasti"),
        ("Siddharthnagar", "Siddharth Nagar"),
        // Uttarakhand
        ("Haridwar", "Hardwar"),
        ("Udham Singh Nagar *", "Udham Singh Nagar"),
        // West Bengal
        ("Bardhaman", "Barddhaman"),
        ("Coochbehar", "Cooch Behar"),
        ("Darjiling", "Darjeeling"),
        ("East Midnapur", "Purba Medinipur"),
        ("East Midnapore", "Purba Medinipur"),
        ("East midnapore", "Purba Medinipur"),
        ("east midnapore", "Purba Medinipur"),
        ("Medinipur West", "Paschim Medinipur"),
        ("West Midnapore", "Paschim Medinipur"),
        ("West Medinipur", "Paschim Medinipur"),
        ("HOOGHLY", "Hooghly"),
        ("Hooghiy", "Hooghly"),
        ("hooghly", "Hooghly"),
        ("HOWRAH", "Howrah"),
        ("Hawrah", "Howrah"),
        ("KOLKATA", "Kolkata"),
        ("MALDA", "Malda"),
        ("Maldah", "Malda"),
        ("NADIA", "Nadia"),
        ("nadia", "Nadia"),
        ("South 24 Pargana", "South 24 Parganas"),
        ("South 24 pargana", "South 24 Parganas"),
        ("South 24 parganas", "South 24 Parganas"),
        ("South Twenty Four Parganas", "South 24 Parganas"),
        ("Puruliya", "Purulia"),
    ])
});

/// Rewrites only valid inside one state. Compass-only names exist as real,
/// distinct districts in Delhi, Tripura, Arunachal Pradesh and elsewhere.
static SCOPED_DISTRICT_ALIASES: Lazy<HashMap<&'static str, HashMap<&'static str, &'static str>>> =
    Lazy::new(|| {
        HashMap::from([(
            "Sikkim",
            HashMap::from([
                ("East", "East Sikkim"),
                ("West", "West Sikkim"),
                ("North", "North Sikkim"),
                ("South", "South Sikkim"),
            ]),
        )])
    });

/// Trim, turn non-breaking spaces into spaces and collapse whitespace runs.
pub fn normalize_whitespace(raw: &str) -> String {
    raw.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical spelling of `raw`, or `None` when it is not a valid geography.
///
/// Lookups and pass-through names are whitespace-normalized first: the name
/// is trimmed, non-breaking spaces become spaces and internal runs collapse to
/// one space, so `"Bara   Banki"` comes back as `"Bara Banki"`.
pub fn canonicalize(raw: &str, kind: NameKind<'_>) -> Option<String> {
    let name = normalize_whitespace(raw);
    match kind {
        NameKind::State => canonical_state(&name),
        NameKind::District { state } => Some(canonical_district(&name, state)),
    }
}

fn canonical_state(name: &str) -> Option<String> {
    if name.is_empty() || name.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if let Some(target) = STATE_ALIASES.get(name) {
        return target.map(str::to_string);
    }
    if let Some(canonical) = STATES_BY_LOWER.get(&name.to_lowercase()) {
        return Some((*canonical).to_string());
    }
    Some(name.to_string())
}

fn canonical_district(name: &str, state: &str) -> String {
    if let Some(target) = SCOPED_DISTRICT_ALIASES
        .get(state)
        .and_then(|aliases| aliases.get(name))
    {
        return (*target).to_string();
    }
    DISTRICT_ALIASES
        .get(name)
        .map(|t| (*t).to_string())
        .unwrap_or_else(|| name.to_string())
}

pub fn is_canonical_state(name: &str) -> bool {
    CANONICAL_STATES.contains(&name)
}

/// Every raw spelling with an explicit table entry, for auditing and tests.
pub fn known_state_inputs() -> Vec<&'static str> {
    let mut v: Vec<&str> = STATE_ALIASES.keys().copied().collect();
    v.extend(CANONICAL_STATES);
    v.sort_unstable();
    v
}

/// (state scope, raw district) pairs with an explicit table entry.
pub fn known_district_inputs() -> Vec<(Option<&'static str>, &'static str)> {
    let mut v: Vec<(Option<&str>, &str)> = DISTRICT_ALIASES.keys().map(|k| (None, *k)).collect();
    for (state, aliases) in SCOPED_DISTRICT_ALIASES.iter() {
        v.extend(aliases.keys().map(|d| (Some(*state), *d)));
    }
    v.sort_unstable();
    v
}
