use crate::error::SegmentError;

/// A stream chunk as named by the forwarder, e.g. `cam1_V1001.ts`:
/// marker `_V`, version `1`, sequence `001`, suffix `.ts`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub version: char,
    pub sequence: u64,
}

impl Segment {
    pub fn parse(id: &str, suffix: &str, marker: &str) -> Result<Self, SegmentError> {
        let stem = id
            .strip_suffix(suffix)
            .ok_or_else(|| SegmentError::MissingSuffix(id.to_string()))?;

        let pos = stem
            .rfind(marker)
            .ok_or_else(|| SegmentError::MissingMarker(id.to_string()))?;
        let tail = &stem[pos + marker.len()..];

        let mut chars = tail.chars();
        let version = chars
            .next()
            .ok_or_else(|| SegmentError::MissingVersion(id.to_string()))?;

        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SegmentError::InvalidSequence(id.to_string()));
        }
        let sequence = digits
            .parse::<u64>()
            .map_err(|_| SegmentError::InvalidSequence(id.to_string()))?;
        // sequences are 1-based, 0 would place the segment before the stream start
        if sequence == 0 {
            return Err(SegmentError::InvalidSequence(id.to_string()));
        }

        Ok(Segment { version, sequence })
    }

    pub fn start_time(&self, segment_duration: f64) -> f64 {
        (self.sequence - 1) as f64 * segment_duration
    }
}

/// Formats a stream time as `m:ss.s`. Rounds to tenths before splitting off
/// the minutes, so 59.96 reads `1:00.0`.
pub fn format_timestamp(time: f64) -> String {
    let tenths = (time * 10.0).round() as u64;
    format!("{}:{:02}.{}", tenths / 600, tenths % 600 / 10, tenths % 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(id: &str) -> Result<Segment, SegmentError> {
        Segment::parse(id, ".ts", "_V")
    }

    #[test]
    fn test_parse_forwarder_name() {
        let seg = parse("cam1_V1001.ts").unwrap();
        assert_eq!(seg.version, '1');
        assert_eq!(seg.sequence, 1);
        assert_eq!(seg.start_time(2.0), 0.0);
        assert_eq!(parse("cam1_V1002.ts").unwrap().start_time(2.0), 2.0);
    }

    #[test]
    fn test_parse_uri_with_path() {
        let seg = parse("https://forwarder/hls/cam_2_V3123.ts").unwrap();
        assert_eq!(seg.version, '3');
        assert_eq!(seg.sequence, 123);
    }

    #[test]
    fn test_start_time_is_non_negative_multiple() {
        for version in ['0', '1', '7'] {
            for sequence in 1..500u64 {
                let id = format!("front_V{version}{sequence:03}.ts");
                let seg = parse(&id).unwrap();
                assert_eq!(seg.sequence, sequence);
                let start = seg.start_time(2.0);
                assert!(start >= 0.0);
                assert_eq!(start % 2.0, 0.0);
                assert_eq!(start, (sequence - 1) as f64 * 2.0);
            }
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(
            parse("cam1_V1001.mp4"),
            Err(SegmentError::MissingSuffix("cam1_V1001.mp4".to_string()))
        );
        assert_eq!(
            parse("cam1_1001.ts"),
            Err(SegmentError::MissingMarker("cam1_1001.ts".to_string()))
        );
        assert_eq!(
            parse("cam1_V.ts"),
            Err(SegmentError::MissingVersion("cam1_V.ts".to_string()))
        );
        assert!(matches!(
            parse("cam1_V1.ts"),
            Err(SegmentError::InvalidSequence(_))
        ));
        assert!(matches!(
            parse("cam1_V1abc.ts"),
            Err(SegmentError::InvalidSequence(_))
        ));
        assert!(matches!(
            parse("cam1_V1000.ts"),
            Err(SegmentError::InvalidSequence(_))
        ));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "0:00.0");
        assert_eq!(format_timestamp(65.3), "1:05.3");
        assert_eq!(format_timestamp(754.0), "12:34.0");
    }

    #[test]
    fn test_format_timestamp_carries_into_minutes() {
        assert_eq!(format_timestamp(59.96), "1:00.0");
        assert_eq!(format_timestamp(9.96), "0:10.0");
        assert_eq!(format_timestamp(119.94), "1:59.9");
        assert_eq!(format_timestamp(-0.01), "0:00.0");
    }
}
