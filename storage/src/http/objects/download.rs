use reqwest::RequestBuilder;

use crate::http::Error;

/// Byte range of a partial download, rendered as
/// `Range: bytes=offset-(offset+length-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub offset: u64,
    pub length: u64,
}

impl Range {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    pub(crate) fn header_value(&self) -> Result<String, Error> {
        if self.length == 0 {
            return Err(Error::InvalidRange(self.offset, self.length));
        }
        Ok(format!("bytes={}-{}", self.offset, self.offset + self.length - 1))
    }
}

pub(crate) fn with_range(builder: RequestBuilder, range: Option<Range>) -> Result<RequestBuilder, Error> {
    match range {
        Some(range) => Ok(builder.header(reqwest::header::RANGE, range.header_value()?)),
        None => Ok(builder),
    }
}

#[cfg(test)]
mod tests {
    use super::Range;
    use crate::http::Error;

    #[test]
    fn range_is_inclusive_of_last_byte() {
        // bytes [5, 8) of a 20-byte object
        assert_eq!(Range::new(5, 3).header_value().unwrap(), "bytes=5-7");
        assert_eq!(Range::new(0, 1).header_value().unwrap(), "bytes=0-0");
    }

    #[test]
    fn zero_length_range_is_rejected() {
        assert!(matches!(
            Range::new(5, 0).header_value().unwrap_err(),
            Error::InvalidRange(5, 0)
        ));
    }
}
