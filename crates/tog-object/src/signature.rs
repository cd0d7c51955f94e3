use bstr::BString;

/// An author/committer identity line: `"<name> <<email>> <seconds> <tz>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: BString,
    pub email: BString,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// Timezone offset in minutes east of UTC.
    pub tz_offset_minutes: i32,
}

impl Signature {
    pub(crate) fn parse(value: &[u8]) -> Option<Self> {
        // "Name <email> 1234567890 +0000"
        let close = value.iter().rposition(|&b| b == b'>')?;
        let open = value[..close].iter().rposition(|&b| b == b'<')?;

        let name = BString::from(trim_ascii(&value[..open]));
        let email = BString::from(&value[open + 1..close]);

        let rest = trim_ascii(&value[close + 1..]);
        let mut parts = rest.split(|&b| b == b' ').filter(|s| !s.is_empty());
        let ts_bytes = parts.next()?;
        let tz_bytes = parts.next()?;

        let timestamp: i64 = std::str::from_utf8(ts_bytes).ok()?.parse().ok()?;
        let tz_offset_minutes = parse_tz_offset(tz_bytes)?;

        Some(Self {
            name,
            email,
            timestamp,
            tz_offset_minutes,
        })
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != b' ').unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|&b| b != b' ').map_or(start, |p| p + 1);
    &bytes[start..end]
}

fn parse_tz_offset(bytes: &[u8]) -> Option<i32> {
    if bytes.len() != 5 {
        return None;
    }
    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let hours: i32 = std::str::from_utf8(&bytes[1..3]).ok()?.parse().ok()?;
    let mins: i32 = std::str::from_utf8(&bytes[3..5]).ok()?.parse().ok()?;
    Some(sign * (hours * 60 + mins))
}
