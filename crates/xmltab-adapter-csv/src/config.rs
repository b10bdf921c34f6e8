//! CSV output options

/// Configuration for writing table files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvConfig {
    /// Field delimiter (default: comma)
    pub delimiter: char,
    /// Quote character for fields that need quoting (default: double quote)
    pub quote_char: char,
    /// How empty values are written (default: empty string)
    pub null_representation: NullRepresentation,
    /// Record terminator (default: CRLF)
    pub record_terminator: RecordTerminator,
}

/// How a column without a value is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NullRepresentation {
    /// Empty field
    EmptyString,
    /// The string "NULL"
    NullString,
    /// The string "\N"
    BackslashN,
    Custom(String),
}

impl NullRepresentation {
    pub fn as_str(&self) -> &str {
        match self {
            NullRepresentation::EmptyString => "",
            NullRepresentation::NullString => "NULL",
            NullRepresentation::BackslashN => "\\N",
            NullRepresentation::Custom(value) => value,
        }
    }
}

/// Recognizes the spellings of the built-in representations; any other text
/// is used verbatim.
impl From<&str> for NullRepresentation {
    fn from(text: &str) -> Self {
        match text {
            "" => NullRepresentation::EmptyString,
            "NULL" => NullRepresentation::NullString,
            "\\N" => NullRepresentation::BackslashN,
            other => NullRepresentation::Custom(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordTerminator {
    /// CRLF (RFC 4180)
    CRLF,
    /// LF
    LF,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote_char: '"',
            null_representation: NullRepresentation::EmptyString,
            record_terminator: RecordTerminator::CRLF,
        }
    }
}

impl CsvConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delimiter character
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the quote character
    pub fn quote_char(mut self, quote_char: char) -> Self {
        self.quote_char = quote_char;
        self
    }

    /// Set null representation
    pub fn null_representation(mut self, null_rep: NullRepresentation) -> Self {
        self.null_representation = null_rep;
        self
    }

    /// Set record terminator
    pub fn record_terminator(mut self, terminator: RecordTerminator) -> Self {
        self.record_terminator = terminator;
        self
    }

    /// Delimiter as a byte. Only ASCII delimiters are accepted by the writer.
    pub fn delimiter_u8(&self) -> Option<u8> {
        u8::try_from(self.delimiter).ok().filter(u8::is_ascii)
    }

    /// Quote character as a byte.
    pub fn quote_char_u8(&self) -> Option<u8> {
        u8::try_from(self.quote_char).ok().filter(u8::is_ascii)
    }

    pub(crate) fn terminator(&self) -> csv::Terminator {
        match self.record_terminator {
            RecordTerminator::CRLF => csv::Terminator::CRLF,
            RecordTerminator::LF => csv::Terminator::Any(b'\n'),
        }
    }
}
