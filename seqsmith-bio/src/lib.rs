//! Sequence records, alphabets, file formats, and the transformation
//! library behind the `seqsmith` command-line tool.

pub mod alphabet;
pub mod codon;
pub mod collection;
pub mod feature;
pub mod formats;
pub mod record;
pub mod transform;
pub mod translate;

pub use alphabet::Alphabet;
pub use collection::SeqCollection;
pub use feature::{Feature, Location};
pub use formats::SeqFormat;
pub use record::SeqRecord;
