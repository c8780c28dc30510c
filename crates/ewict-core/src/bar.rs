use std::path::Path;

/// Struct-of-Arrays bar storage for cache-efficient scans.
///
/// All vectors are parallel — index `i` across all fields is one bar.
/// Timestamps are carried for display only; every algorithm addresses
/// bars by integer index.
#[derive(Debug, Clone)]
pub struct BarSeries {
    pub timestamps: Vec<i64>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl BarSeries {
    pub fn new() -> Self {
        Self {
            timestamps: Vec::new(),
            open: Vec::new(),
            high: Vec::new(),
            low: Vec::new(),
            close: Vec::new(),
            volume: Vec::new(),
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            timestamps: Vec::with_capacity(cap),
            open: Vec::with_capacity(cap),
            high: Vec::with_capacity(cap),
            low: Vec::with_capacity(cap),
            close: Vec::with_capacity(cap),
            volume: Vec::with_capacity(cap),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.open.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn push(&mut self, ts: i64, o: f64, h: f64, l: f64, c: f64, v: f64) {
        self.timestamps.push(ts);
        self.open.push(o);
        self.high.push(h);
        self.low.push(l);
        self.close.push(c);
        self.volume.push(v);
    }

    /// Load bars from a CSV file using memory-mapped I/O.
    ///
    /// Columns are located by header name (case-insensitive). `open`,
    /// `high`, `low`, `close` are required; `volume` defaults to 1.0 when
    /// the column is absent; a `time`/`timestamp`/`date`/`datetime`
    /// column is optional.
    pub fn from_csv(path: &Path) -> Result<Self, CsvError> {
        let file = std::fs::File::open(path).map_err(|e| CsvError::Io(e.to_string()))?;
        let mmap =
            unsafe { memmap2::Mmap::map(&file) }.map_err(|e| CsvError::Io(e.to_string()))?;
        Self::parse_csv_bytes(&mmap[..])
    }

    /// Parse CSV from raw bytes (testable without files).
    pub fn parse_csv_bytes(data: &[u8]) -> Result<Self, CsvError> {
        // Average OHLCV row is ~50 bytes; pre-allocate on that estimate.
        let mut series = Self::with_capacity(data.len() / 50);
        let len = data.len();

        let header_end = match memchr::memchr(b'\n', data) {
            Some(nl) => nl,
            None => return Ok(series),
        };
        let columns = ColumnMap::from_header(trim_cr(&data[..header_end]))?;

        let mut pos = header_end + 1;
        let mut row = 0usize;
        while pos < len {
            let line_end = memchr::memchr(b'\n', &data[pos..])
                .map(|i| pos + i)
                .unwrap_or(len);
            let line = trim_cr(&data[pos..line_end]);

            if !line.is_empty() {
                columns.parse_row(line, row, &mut series)?;
                row += 1;
            }
            pos = line_end + 1;
        }

        // CSV exports are not always chronological; reorder when the file
        // carries real timestamps.
        if columns.time.is_some() && !series.is_empty() {
            let mut indices: Vec<usize> = (0..series.len()).collect();
            indices.sort_by_key(|&i| series.timestamps[i]);
            return Ok(Self::reorder(&series, &indices));
        }

        Ok(series)
    }

    fn reorder(series: &BarSeries, indices: &[usize]) -> BarSeries {
        let mut result = BarSeries::with_capacity(indices.len());
        for &i in indices {
            result.push(
                series.timestamps[i],
                series.open[i],
                series.high[i],
                series.low[i],
                series.close[i],
                series.volume[i],
            );
        }
        result
    }

    /// Copy a sub-range into a new BarSeries.
    pub fn slice(&self, start: usize, end: usize) -> BarSeries {
        let end = end.min(self.len());
        let start = start.min(end);
        BarSeries {
            timestamps: self.timestamps[start..end].to_vec(),
            open: self.open[start..end].to_vec(),
            high: self.high[start..end].to_vec(),
            low: self.low[start..end].to_vec(),
            close: self.close[start..end].to_vec(),
            volume: self.volume[start..end].to_vec(),
        }
    }
}

impl Default for BarSeries {
    fn default() -> Self {
        Self::new()
    }
}

/// Header-resolved column positions within a CSV row.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
    time: Option<usize>,
}

impl ColumnMap {
    fn from_header(header: &[u8]) -> Result<Self, CsvError> {
        let mut open = None;
        let mut high = None;
        let mut low = None;
        let mut close = None;
        let mut volume = None;
        let mut time = None;

        for (idx, field) in SplitCommas::new(header).enumerate() {
            let name = std::str::from_utf8(field)
                .map_err(|_| CsvError::Parse("non-UTF8 header".into()))?
                .trim()
                .to_ascii_lowercase();
            match name.as_str() {
                "open" => open = Some(idx),
                "high" => high = Some(idx),
                "low" => low = Some(idx),
                "close" | "adj close" | "adj_close" => {
                    // Prefer a plain `close` over an adjusted one.
                    if close.is_none() || name == "close" {
                        close = Some(idx);
                    }
                }
                "volume" | "vol" => volume = Some(idx),
                "time" | "timestamp" | "date" | "datetime" => time = Some(idx),
                _ => {}
            }
        }

        let missing = |what: &str| CsvError::Parse(format!("missing required column: {what}"));
        Ok(Self {
            open: open.ok_or_else(|| missing("open"))?,
            high: high.ok_or_else(|| missing("high"))?,
            low: low.ok_or_else(|| missing("low"))?,
            close: close.ok_or_else(|| missing("close"))?,
            volume,
            time,
        })
    }

    fn parse_row(&self, line: &[u8], row: usize, series: &mut BarSeries) -> Result<(), CsvError> {
        let mut o = f64::NAN;
        let mut h = f64::NAN;
        let mut l = f64::NAN;
        let mut c = f64::NAN;
        let mut v = 1.0;
        let mut ts = row as i64;

        let mut seen = 0u8;
        for (idx, field) in SplitCommas::new(line).enumerate() {
            if idx == self.open {
                o = parse_price(field, "open")?;
                seen |= 1;
            }
            if idx == self.high {
                h = parse_price(field, "high")?;
                seen |= 2;
            }
            if idx == self.low {
                l = parse_price(field, "low")?;
                seen |= 4;
            }
            if idx == self.close {
                c = parse_price(field, "close")?;
                seen |= 8;
            }
            if Some(idx) == self.volume {
                v = parse_price(field, "volume")?;
            }
            if Some(idx) == self.time {
                ts = parse_timestamp(field)?;
            }
        }

        if seen != 0b1111 {
            return Err(CsvError::Parse(format!("row {row}: too few columns")));
        }

        series.push(ts, o, h, l, c, v);
        Ok(())
    }
}

/// Iterator over comma-separated fields of a single line.
struct SplitCommas<'a> {
    rest: Option<&'a [u8]>,
}

impl<'a> SplitCommas<'a> {
    fn new(line: &'a [u8]) -> Self {
        Self { rest: Some(line) }
    }
}

impl<'a> Iterator for SplitCommas<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let rest = self.rest?;
        match memchr::memchr(b',', rest) {
            Some(i) => {
                self.rest = Some(&rest[i + 1..]);
                Some(&rest[..i])
            }
            None => {
                self.rest = None;
                Some(rest)
            }
        }
    }
}

#[inline]
fn trim_cr(line: &[u8]) -> &[u8] {
    if line.last() == Some(&b'\r') {
        &line[..line.len() - 1]
    } else {
        line
    }
}

#[inline]
fn parse_price(bytes: &[u8], what: &str) -> Result<f64, CsvError> {
    fast_float::parse(bytes).map_err(|_| {
        CsvError::Parse(format!(
            "bad {what}: {}",
            String::from_utf8_lossy(bytes)
        ))
    })
}

/// Parse a timestamp field to Unix epoch seconds.
///
/// Handles plain integers, `2025-01-01T00:00:00Z`,
/// `2025-01-01T00:00:00+00:00`, and bare `2025-01-01` dates.
fn parse_timestamp(bytes: &[u8]) -> Result<i64, CsvError> {
    if let Ok(ts) = fast_float::parse::<f64, _>(bytes) {
        if !bytes.contains(&b'-') && !bytes.contains(&b'T') {
            return Ok(ts as i64);
        }
    }

    if bytes.len() < 10 {
        return Err(CsvError::Parse(format!(
            "timestamp too short: {}",
            String::from_utf8_lossy(bytes)
        )));
    }

    let s = std::str::from_utf8(bytes)
        .map_err(|_| CsvError::Parse("non-UTF8 timestamp".into()))?;

    let year: i32 = s[0..4]
        .parse()
        .map_err(|_| CsvError::Parse("bad year".into()))?;
    let month: u32 = s[5..7]
        .parse()
        .map_err(|_| CsvError::Parse("bad month".into()))?;
    let day: u32 = s[8..10]
        .parse()
        .map_err(|_| CsvError::Parse("bad day".into()))?;

    let (hour, minute, second) = if s.len() >= 19 {
        let h: i64 = s[11..13]
            .parse()
            .map_err(|_| CsvError::Parse("bad hour".into()))?;
        let m: i64 = s[14..16]
            .parse()
            .map_err(|_| CsvError::Parse("bad minute".into()))?;
        let sec: i64 = s[17..19]
            .parse()
            .map_err(|_| CsvError::Parse("bad second".into()))?;
        (h, m, sec)
    } else {
        (0, 0, 0)
    };

    let days = days_from_civil(year, month, day);
    Ok(days * 86400 + hour * 3600 + minute * 60 + second)
}

/// Convert civil date to days since Unix epoch (Howard Hinnant algorithm).
fn days_from_civil(year: i32, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year } as i64;
    let m = if month <= 2 {
        month as i64 + 9
    } else {
        month as i64 - 3
    };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64;
    let doy = (153 * m as u64 + 2) / 5 + day as u64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe as i64 - 719468
}

#[derive(Debug)]
pub enum CsvError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CsvError::Io(e) => write!(f, "I/O error: {}", e),
            CsvError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for CsvError {}
