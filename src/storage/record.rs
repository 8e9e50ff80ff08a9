//! Record - one game row of the store.

use crate::common::config::{DATE_FIELD_SIZE, RECORD_SIZE};
use crate::common::wire::Decoder;
use crate::common::{Error, Result};

/// One home-team game line.
///
/// The indexed attribute is the free-throw percentage (`ft_pct`); every
/// other field is carried as payload.
///
/// # Layout
/// Records are accounted at a fixed [`RECORD_SIZE`] regardless of content:
/// a [`DATE_FIELD_SIZE`]-byte date followed by eight 4-byte numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub game_date: String,
    pub team_id: i32,
    pub points: i32,
    pub fg_pct: f32,
    pub ft_pct: f32,
    pub fg3_pct: f32,
    pub assists: i32,
    pub rebounds: i32,
    pub home_team_wins: i32,
}

impl Record {
    /// Number of tab-separated fields in an input line.
    pub const FIELD_COUNT: usize = 9;

    /// Parse a tab-delimited line.
    ///
    /// Empty numeric fields read as zero and missing trailing fields are
    /// treated as empty. `line_no` is only used for error reporting.
    ///
    /// # Errors
    /// Returns `Error::Parse` if a numeric field is malformed or the date
    /// is wider than its fixed field.
    pub fn from_delimited(line: &str, line_no: usize) -> Result<Self> {
        let mut fields = line.trim_end_matches(['\r', '\n']).split('\t');
        let mut next = || fields.next().unwrap_or("").trim();

        let game_date = next().to_string();
        if game_date.len() > DATE_FIELD_SIZE {
            return Err(Error::Parse {
                line: line_no,
                reason: format!("date '{}' exceeds {} bytes", game_date, DATE_FIELD_SIZE),
            });
        }

        Ok(Self {
            game_date,
            team_id: parse_int(next(), line_no)?,
            points: parse_int(next(), line_no)?,
            fg_pct: parse_float(next(), line_no)?,
            ft_pct: parse_float(next(), line_no)?,
            fg3_pct: parse_float(next(), line_no)?,
            assists: parse_int(next(), line_no)?,
            rebounds: parse_int(next(), line_no)?,
            home_team_wins: parse_int(next(), line_no)?,
        })
    }

    /// The attribute the index is built on.
    #[inline]
    pub fn indexed_key(&self) -> f32 {
        self.ft_pct
    }

    /// Bytes this record occupies inside a block.
    #[inline]
    pub const fn size() -> usize {
        RECORD_SIZE
    }

    /// Append exactly [`RECORD_SIZE`] bytes: the date NUL-padded to
    /// [`DATE_FIELD_SIZE`], then the eight numbers little-endian.
    ///
    /// A date wider than its field is cut at the last whole character that
    /// fits. Parsed records never are.
    pub(crate) fn encode_into(&self, buf: &mut Vec<u8>) {
        let mut end = self.game_date.len().min(DATE_FIELD_SIZE);
        while !self.game_date.is_char_boundary(end) {
            end -= 1;
        }
        let mut date = [0u8; DATE_FIELD_SIZE];
        date[..end].copy_from_slice(&self.game_date.as_bytes()[..end]);
        buf.extend_from_slice(&date);

        buf.extend_from_slice(&self.team_id.to_le_bytes());
        buf.extend_from_slice(&self.points.to_le_bytes());
        buf.extend_from_slice(&self.fg_pct.to_bits().to_le_bytes());
        buf.extend_from_slice(&self.ft_pct.to_bits().to_le_bytes());
        buf.extend_from_slice(&self.fg3_pct.to_bits().to_le_bytes());
        buf.extend_from_slice(&self.assists.to_le_bytes());
        buf.extend_from_slice(&self.rebounds.to_le_bytes());
        buf.extend_from_slice(&self.home_team_wins.to_le_bytes());
    }

    /// Read one record written by [`Record::encode_into`].
    pub(crate) fn decode_from(dec: &mut Decoder<'_>) -> Result<Self> {
        let at = dec.position();
        let date = dec.take::<DATE_FIELD_SIZE>()?;
        let len = date.iter().position(|&b| b == 0).unwrap_or(DATE_FIELD_SIZE);
        let game_date = std::str::from_utf8(&date[..len])
            .map_err(|_| Error::corrupt(format!("record at byte {} has a non-UTF-8 date", at)))?
            .to_string();

        let record = Self {
            game_date,
            team_id: dec.i32()?,
            points: dec.i32()?,
            fg_pct: dec.f32()?,
            ft_pct: dec.f32()?,
            fg3_pct: dec.f32()?,
            assists: dec.i32()?,
            rebounds: dec.i32()?,
            home_team_wins: dec.i32()?,
        };
        if record.indexed_key().is_nan() {
            return Err(Error::corrupt(format!("record at byte {} has a NaN key", at)));
        }
        Ok(record)
    }
}

fn parse_int(token: &str, line_no: usize) -> Result<i32> {
    if token.is_empty() {
        return Ok(0);
    }
    token.parse().map_err(|e| Error::Parse {
        line: line_no,
        reason: format!("'{}': {}", token, e),
    })
}

fn parse_float(token: &str, line_no: usize) -> Result<f32> {
    if token.is_empty() {
        return Ok(0.0);
    }
    let value: f32 = token.parse().map_err(|e| Error::Parse {
        line: line_no,
        reason: format!("'{}': {}", token, e),
    })?;
    if value.is_nan() {
        return Err(Error::Parse {
            line: line_no,
            reason: format!("'{}' is not a number", token),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_line() {
        let line = "2022-12-22\t1610612740\t126\t0.484\t0.926\t0.382\t25\t46\t1";
        let r = Record::from_delimited(line, 1).unwrap();

        assert_eq!(r.game_date, "2022-12-22");
        assert_eq!(r.team_id, 1610612740);
        assert_eq!(r.points, 126);
        assert_eq!(r.ft_pct, 0.926);
        assert_eq!(r.indexed_key(), 0.926);
        assert_eq!(r.rebounds, 46);
        assert_eq!(r.home_team_wins, 1);
    }

    #[test]
    fn test_empty_fields_default_to_zero() {
        let line = "2003-10-05\t1610612762\t\t\t\t\t\t\t";
        let r = Record::from_delimited(line, 1).unwrap();
        assert_eq!(r.points, 0);
        assert_eq!(r.ft_pct, 0.0);
        assert_eq!(r.home_team_wins, 0);
    }

    #[test]
    fn test_missing_trailing_fields() {
        let r = Record::from_delimited("2003-10-05\t1", 1).unwrap();
        assert_eq!(r.team_id, 1);
        assert_eq!(r.assists, 0);
    }

    #[test]
    fn test_crlf_is_trimmed() {
        let line = "2022-12-22\t1\t2\t0.5\t0.75\t0.25\t3\t4\t0\r\n";
        let r = Record::from_delimited(line, 1).unwrap();
        assert_eq!(r.home_team_wins, 0);
    }

    #[test]
    fn test_malformed_number_fails() {
        let line = "2022-12-22\tabc\t2\t0.5\t0.75\t0.25\t3\t4\t0";
        match Record::from_delimited(line, 7) {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 7),
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_key_rejected() {
        let line = "2022-12-22\t1\t2\t0.5\tNaN\t0.25\t3\t4\t0";
        assert!(Record::from_delimited(line, 1).is_err());
    }

    #[test]
    fn test_encoded_width_is_record_size() {
        let line = "2022-12-22\t-5\t126\t0.484\t0.926\t0.382\t25\t46\t1";
        let r = Record::from_delimited(line, 1).unwrap();

        let mut buf = Vec::new();
        r.encode_into(&mut buf);
        assert_eq!(buf.len(), RECORD_SIZE);
        assert_eq!(&buf[..DATE_FIELD_SIZE], b"2022-12-22");
        assert_eq!(&buf[10..14], &(-5i32).to_le_bytes());

        let mut dec = Decoder::new(&buf);
        assert_eq!(Record::decode_from(&mut dec).unwrap(), r);
        assert_eq!(dec.remaining(), 0);
    }

    #[test]
    fn test_short_and_wide_dates_encode() {
        let mut r = Record::from_delimited("2003-10\t1", 1).unwrap();
        let mut buf = Vec::new();
        r.encode_into(&mut buf);
        let decoded = Record::decode_from(&mut Decoder::new(&buf)).unwrap();
        assert_eq!(decoded.game_date, "2003-10");

        // 'é' is two bytes and straddles the field edge
        r.game_date = "2003-10-0é".into();
        buf.clear();
        r.encode_into(&mut buf);
        assert_eq!(buf.len(), RECORD_SIZE);
        let decoded = Record::decode_from(&mut Decoder::new(&buf)).unwrap();
        assert_eq!(decoded.game_date, "2003-10-0");
    }

    #[test]
    fn test_decoded_nan_key_is_corrupt() {
        let mut r = Record::from_delimited("2003-10-05\t1", 1).unwrap();
        r.ft_pct = f32::NAN;
        let mut buf = Vec::new();
        r.encode_into(&mut buf);
        assert!(matches!(
            Record::decode_from(&mut Decoder::new(&buf)),
            Err(Error::CorruptFormat(_))
        ));
    }

    #[test]
    fn test_oversized_date_rejected() {
        let line = "2022-12-22T00:00\t1\t2\t0.5\t0.75\t0.25\t3\t4\t0";
        assert!(Record::from_delimited(line, 1).is_err());
    }
}
