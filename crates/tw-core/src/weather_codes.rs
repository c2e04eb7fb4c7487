//! Fixed weather-code lookup table used to label merged rows.

/// `(code, description)` pairs, ascending by code.
pub const WEATHER_CODES: &[(i32, &str)] = &[
    (0, "Clear sky"),
    (1, "Mainly clear"),
    (2, "Partly cloudy"),
    (3, "Overcast"),
    (45, "Fog"),
    (48, "Fog in the morning"),
    (51, "Drizzle"),
    (53, "Rain"),
    (55, "Heavy rain"),
    (61, "Showers"),
    (63, "Heavy showers"),
    (80, "Thunderstorm"),
    (81, "Snow"),
    (82, "Heavy snow"),
    (85, "Rain showers"),
    (86, "Snow showers"),
];

/// Look up the description for `code`.
///
/// Unrecognised codes yield `None` rather than an error.
pub fn describe(code: i32) -> Option<&'static str> {
    WEATHER_CODES
        .binary_search_by_key(&code, |(c, _)| *c)
        .ok()
        .map(|idx| WEATHER_CODES[idx].1)
}
