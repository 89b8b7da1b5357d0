//! Reference tables for the address pickers. A representative subset; the
//! client treats unknown keys as "no options".

pub const PROVINCES: &[&str] = &[
    "İstanbul", "Ankara", "İzmir", "Bursa", "Antalya", "Adana", "Konya", "Gaziantep", "Mersin",
    "Eskişehir", "Trabzon",
];

const DISTRICTS: &[(&str, &[&str])] = &[
    (
        "İstanbul",
        &[
            "Ataşehir", "Bakırköy", "Beşiktaş", "Beyoğlu", "Fatih", "Kadıköy", "Maltepe", "Sarıyer",
            "Şişli", "Üsküdar",
        ],
    ),
    (
        "Ankara",
        &["Altındağ", "Çankaya", "Etimesgut", "Keçiören", "Mamak", "Sincan", "Yenimahalle"],
    ),
    (
        "İzmir",
        &["Bayraklı", "Bornova", "Buca", "Karşıyaka", "Konak", "Çiğli"],
    ),
    ("Bursa", &["Nilüfer", "Osmangazi", "Yıldırım"]),
    ("Antalya", &["Konyaaltı", "Kepez", "Muratpaşa"]),
    ("Mersin", &["Akdeniz", "Mezitli", "Toroslar", "Yenişehir"]),
];

const NEIGHBORHOODS: &[((&str, &str), &[&str])] = &[
    (
        ("İstanbul", "Kadıköy"),
        &[
            "Bostancı", "Caddebostan", "Erenköy", "Fenerbahçe", "Göztepe", "Koşuyolu", "Moda",
            "Suadiye",
        ],
    ),
    (
        ("İstanbul", "Beşiktaş"),
        &["Bebek", "Etiler", "Gayrettepe", "Levent", "Ortaköy", "Yıldız"],
    ),
    (
        ("İstanbul", "Şişli"),
        &["Esentepe", "Feriköy", "Mecidiyeköy", "Nişantaşı", "Teşvikiye"],
    ),
    (
        ("İstanbul", "Üsküdar"),
        &["Acıbadem", "Altunizade", "Beylerbeyi", "Çengelköy", "Kuzguncuk"],
    ),
    (
        ("Ankara", "Çankaya"),
        &["Bahçelievler", "Kavaklıdere", "Kızılay", "Çayyolu", "Ümitköy"],
    ),
    (
        ("İzmir", "Konak"),
        &["Alsancak", "Göztepe", "Güzelyalı", "Hatay", "Kemeraltı"],
    ),
    (
        ("Mersin", "Yenişehir"),
        &["Cumhuriyet", "Gazi", "Limonluk", "Menteş"],
    ),
];

pub fn districts(province: &str) -> &'static [&'static str] {
    DISTRICTS
        .iter()
        .find(|(name, _)| *name == province)
        .map(|(_, districts)| *districts)
        .unwrap_or(&[])
}

pub fn neighborhoods(province: &str, district: &str) -> &'static [&'static str] {
    NEIGHBORHOODS
        .iter()
        .find(|((p, d), _)| *p == province && *d == district)
        .map(|(_, neighborhoods)| *neighborhoods)
        .unwrap_or(&[])
}
