// Pipeline storage: CSV output

pub mod csv_writer;

pub use csv_writer::{write_table, CsvEncoding, CsvWriteReport, DroppedRow};
