use crate::process::NormalizeError;

/// One source CSV held as text. `None` is the single missing-sentinel for
/// empty or absent cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    /// Column names in source order.
    pub headers: Vec<String>,
    /// Each row padded to `headers.len()`.
    pub rows: Vec<Vec<Option<String>>>,
}

/// Borrowed view of a single row.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    headers: &'a [String],
    values: &'a [Option<String>],
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding short rows with missing cells and dropping overflow.
    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, NormalizeError> {
        self.column_index(name)
            .ok_or_else(|| NormalizeError::MissingColumn(name.to_string()))
    }

    /// Indices of every column from `first` through `last` inclusive, in header order.
    pub fn column_span(&self, first: &str, last: &str) -> Result<Vec<usize>, NormalizeError> {
        let start = self.require_column(first)?;
        let end = self.require_column(last)?;
        if end < start {
            return Err(NormalizeError::InvertedSpan {
                first: first.to_string(),
                last: last.to_string(),
            });
        }
        Ok((start..=end).collect())
    }

    /// Rewrite every cell of `name` in place. Returns false if the column is absent.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> bool
    where
        F: FnMut(Option<String>) -> Option<String>,
    {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        for row in &mut self.rows {
            let cell = row[idx].take();
            row[idx] = f(cell);
        }
        true
    }

    pub fn records(&self) -> impl ExactSizeIterator<Item = RawRecord<'_>> + '_ {
        self.rows.iter().map(|values| RawRecord {
            headers: &self.headers,
            values,
        })
    }

    pub fn record(&self, row: usize) -> Option<RawRecord<'_>> {
        self.rows.get(row).map(|values| RawRecord {
            headers: &self.headers,
            values,
        })
    }
}

impl<'a> RawRecord<'a> {
    pub fn new(headers: &'a [String], values: &'a [Option<String>]) -> Self {
        Self { headers, values }
    }

    pub fn at(&self, idx: usize) -> Option<&'a str> {
        self.values.get(idx).and_then(|v| v.as_deref())
    }

    pub fn get(&self, name: &str) -> Option<&'a str> {
        let idx = self.headers.iter().position(|h| h == name)?;
        self.at(idx)
    }

    pub fn values(&self) -> &'a [Option<String>] {
        self.values
    }
}
