use serde::Serialize;

pub const MAX_RADIUS_KM: f64 = 30.0;
const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy)]
pub struct SupportSite {
    pub id: i64,
    pub name: &'static str,
    pub address: &'static str,
    pub phone: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub city: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportLocation {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub distance_km: Option<f64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub city: Option<String>,
}

impl From<&SupportSite> for SupportLocation {
    fn from(site: &SupportSite) -> Self {
        SupportLocation {
            id: site.id,
            name: site.name.to_string(),
            address: site.address.to_string(),
            phone: Some(site.phone.to_string()),
            website: None,
            distance_km: None,
            lat: Some(site.lat),
            lng: Some(site.lng),
            city: Some(site.city.to_string()),
        }
    }
}

macro_rules! site {
    ($id:expr, $name:expr, $address:expr, $phone:expr, $lat:expr, $lng:expr, $city:expr) => {
        SupportSite {
            id: $id,
            name: $name,
            address: $address,
            phone: $phone,
            lat: $lat,
            lng: $lng,
            city: $city,
        }
    };
}

pub static SUPPORT_SITES: &[SupportSite] = &[
    // Haifa region
    site!(1, "Haifa Mental Health Center", "Haifa, Israel", "+972-4-0000000", 32.8, 35.0, "haifa"),
    site!(2, "Carmel Psychology Clinic", "Haifa, Israel", "+972-4-0001111", 32.79, 35.01, "haifa"),
    site!(3, "Tirat Carmel Mental Health Service", "Tirat Carmel, Israel", "+972-4-0002222", 32.76, 34.97, "tirat carmel"),
    site!(4, "Krayot Counseling Center", "Kiryat Bialik / Kiryat Motzkin, Israel", "+972-4-0003333", 32.83, 35.09, "krayot"),
    // Tel Aviv metro
    site!(10, "Tel Aviv Mental Health Center", "Tel Aviv, Israel", "+972-3-0000000", 32.0853, 34.7818, "tel aviv"),
    site!(11, "Tel Aviv City Psychology Clinic", "Tel Aviv, Israel", "+972-3-0001111", 32.08, 34.78, "tel aviv"),
    site!(12, "Ramat Gan Counseling Center", "Ramat Gan, Israel", "+972-3-0002222", 32.08, 34.82, "ramat gan"),
    site!(13, "Bnei Brak Family Therapy Clinic", "Bnei Brak, Israel", "+972-3-0003333", 32.08, 34.83, "bnei brak"),
    site!(14, "Holon Mental Health Service", "Holon, Israel", "+972-3-0004444", 32.01, 34.77, "holon"),
    site!(15, "Bat Yam Psychology Clinic", "Bat Yam, Israel", "+972-3-0005555", 32.02, 34.75, "bat yam"),
    site!(16, "Herzliya Counseling & Support", "Herzliya, Israel", "+972-9-0000000", 32.16, 34.84, "herzliya"),
    site!(17, "Netanya Psychological Services", "Netanya, Israel", "+972-9-0001111", 32.32, 34.86, "netanya"),
    // Central district
    site!(20, "Rishon LeZion Mental Health Clinic", "Rishon LeZion, Israel", "+972-3-0006666", 31.97, 34.79, "rishon lezion"),
    site!(21, "Petah Tikva Counseling Center", "Petah Tikva, Israel", "+972-3-0007777", 32.09, 34.88, "petah tikva"),
    site!(22, "Kfar Saba Mental Health Service", "Kfar Saba, Israel", "+972-9-0002222", 32.18, 34.91, "kfar saba"),
    site!(23, "Ra'anana Psychology Clinic", "Ra'anana, Israel", "+972-9-0003333", 32.19, 34.87, "raanana"),
    site!(24, "Rehovot Counseling Center", "Rehovot, Israel", "+972-8-0000000", 31.89, 34.81, "rehovot"),
    site!(25, "Lod Family Therapy Clinic", "Lod, Israel", "+972-8-0001111", 31.95, 34.89, "lod"),
    site!(26, "Ramla Psychological Services", "Ramla, Israel", "+972-8-0002222", 31.93, 34.86, "ramla"),
    site!(27, "Modiin-Maccabim-Reut Counseling Center", "Modiin-Maccabim-Reut, Israel", "+972-8-0003333", 31.90, 35.01, "modiin"),
    // Jerusalem area
    site!(30, "Jerusalem Psychological Services", "Jerusalem, Israel", "+972-2-0000000", 31.7683, 35.2137, "jerusalem"),
    site!(31, "Jerusalem Youth Counseling Clinic", "Jerusalem, Israel", "+972-2-0001111", 31.77, 35.22, "jerusalem"),
    site!(32, "Ma'ale Adumim Mental Health Service", "Ma'ale Adumim, Israel", "+972-2-0002222", 31.78, 35.30, "maale adumim"),
    // South
    site!(40, "Be'er Sheva Mental Health Center", "Be'er Sheva, Israel", "+972-8-0000000", 31.252, 34.791, "beer sheva"),
    site!(41, "Negev Counseling Clinic", "Be'er Sheva, Israel", "+972-8-0001111", 31.25, 34.79, "beer sheva"),
    site!(42, "Ashdod Psychological Services", "Ashdod, Israel", "+972-8-0002222", 31.80, 34.65, "ashdod"),
    site!(43, "Ashkelon Counseling Center", "Ashkelon, Israel", "+972-8-0003333", 31.67, 34.57, "ashkelon"),
    site!(44, "Eilat Mental Health Clinic", "Eilat, Israel", "+972-8-0004444", 29.558, 34.95, "eilat"),
    // North
    site!(50, "Nazareth Mental Health Service", "Nazareth, Israel", "+972-4-0000000", 32.704, 35.303, "nazareth"),
    site!(51, "Nazareth Family Counseling Center", "Nazareth, Israel", "+972-4-0001111", 32.705, 35.30, "nazareth"),
    site!(52, "Tiberias Psychological Clinic", "Tiberias, Israel", "+972-4-0002222", 32.79, 35.53, "tiberias"),
    site!(53, "Safed Mental Health Service", "Safed, Israel", "+972-4-0003333", 32.97, 35.50, "safed"),
    site!(54, "Acre Counseling Center", "Acre, Israel", "+972-4-0004444", 32.93, 35.08, "acre"),
];

/// Great-circle distance in kilometres.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lng2 - lng1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// City search wins over coordinates. No criteria yields an empty list.
pub fn find_locations(city: Option<&str>, lat: Option<f64>, lng: Option<f64>) -> Vec<SupportLocation> {
    if let Some(city) = city.map(|c| c.trim().to_lowercase()).filter(|c| !c.is_empty()) {
        return SUPPORT_SITES
            .iter()
            .filter(|site| site.city.contains(city.as_str()))
            .map(SupportLocation::from)
            .collect();
    }

    let (Some(lat), Some(lng)) = (lat, lng) else {
        return Vec::new();
    };

    let mut nearby: Vec<SupportLocation> = SUPPORT_SITES
        .iter()
        .filter_map(|site| {
            let distance = haversine_km(lat, lng, site.lat, site.lng);
            if distance > MAX_RADIUS_KM {
                return None;
            }
            let mut location = SupportLocation::from(site);
            location.distance_km = Some((distance * 10.0).round() / 10.0);
            Some(location)
        })
        .collect();

    nearby.sort_by(|a, b| {
        a.distance_km
            .unwrap_or(0.0)
            .total_cmp(&b.distance_km.unwrap_or(0.0))
    });
    nearby
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_match_is_case_insensitive_substring() {
        let found = find_locations(Some("  TEL "), None, None);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|l| l.city.as_deref() == Some("tel aviv")));
    }

    #[test]
    fn coordinates_return_sorted_sites_within_radius() {
        let found = find_locations(None, Some(32.0853), Some(34.7818));
        assert!(!found.is_empty());
        assert_eq!(found[0].id, 10);
        assert_eq!(found[0].distance_km, Some(0.0));
        let distances: Vec<f64> = found.iter().filter_map(|l| l.distance_km).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
        assert!(distances.iter().all(|d| *d <= MAX_RADIUS_KM));
        assert!(found.iter().all(|l| l.city.as_deref() != Some("haifa")));
    }

    #[test]
    fn no_criteria_is_empty() {
        assert!(find_locations(None, None, None).is_empty());
        assert!(find_locations(None, Some(32.0), None).is_empty());
        assert!(find_locations(None, Some(0.0), Some(0.0)).is_empty());
    }

    #[test]
    fn haversine_is_zero_for_same_point() {
        assert!(haversine_km(31.0, 35.0, 31.0, 35.0).abs() < 1e-9);
        let d = haversine_km(32.0853, 34.7818, 31.7683, 35.2137);
        assert!((d - 54.0).abs() < 2.0);
    }
}
