//! Rule-based filtering of VCF variant calls.
//!
//! Records are tested against a [`FilterSpec`]: an optional QUAL threshold,
//! three built-in filters for pileup calls (indel, AF1, DP4) and any number
//! of INFO rules such as `DP<30` or `sum(DP4[2],DP4[3])<4`. Each record is
//! kept or discarded, and a [`FilterResult`] counts the outcome.
//!
//! ```no_run
//! use vcf_filter::{filter_vcf, FilterSpec};
//!
//! let spec = FilterSpec::builder()
//!     .qual_threshold(50.0)
//!     .indel_filter(true)
//!     .dp4_filter(true)
//!     .rule("MQ", "<30")
//!     .rule("PV4[0]", "<0.001")
//!     .build()?;
//! let result = filter_vcf("calls.vcf", "calls.filtered.vcf", None::<&str>, &spec, false)?;
//! println!("{} of {} records kept", result.kept, result.total);
//! # Ok::<(), vcf_filter::Error>(())
//! ```

pub mod cli;
pub mod errors;
pub mod filter;
pub(crate) mod parser;
pub mod reader;
pub mod record;
pub mod types;
pub mod writer;

use std::path::Path;

use log::info;

pub use errors::{Error, Result};
pub use filter::{FilterConfig, FilterResult, FilterSpec, VariantFilter};
pub use reader::VcfRecords;
pub use record::{Record, VcfRecord};
pub use types::VcfFlavor;
pub use writer::{RecordSink, StagedFile, VcfWriter};

use types::Header;

/// Filter the VCF file at `input` into `output`, optionally writing the
/// discarded records to `filtered`.
///
/// Files that are neither mpileup VCFv4.1 nor freebayes VCFv4.2 are refused
/// unless `force` is set.
pub fn filter_vcf<P, Q, F>(
    input: P,
    output: Q,
    filtered: Option<F>,
    spec: &FilterSpec,
    force: bool,
) -> Result<FilterResult>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    F: AsRef<Path>,
{
    let records = VcfRecords::from_path(input)?;
    let header = records.header().clone();
    let flavor = header.flavor();
    if flavor == VcfFlavor::Unknown {
        if !force {
            return Err(Error::UnsupportedFlavor {
                flavor: flavor.to_string(),
                version: header.version().unwrap_or("?").to_owned(),
                source_name: header.source().unwrap_or("?").to_owned(),
            });
        }
        info!(
            "VCF version {} not tested, filtering anyway",
            header.version().unwrap_or("?")
        );
    }

    filter_into(
        records,
        &header,
        output.as_ref(),
        filtered.as_ref().map(AsRef::as_ref),
        spec,
    )
}

/// Outputs are staged and only moved into place once the whole pass succeeded.
fn filter_into<I>(
    records: I,
    header: &Header,
    output: &Path,
    filtered: Option<&Path>,
    spec: &FilterSpec,
) -> Result<FilterResult>
where
    I: IntoIterator<Item = Result<VcfRecord>>,
{
    let kept_file = StagedFile::create(output)?;
    let discarded_file = filtered.map(StagedFile::create).transpose()?;
    let result = {
        let mut kept = kept_file.writer(header)?;
        let mut discarded = discarded_file
            .as_ref()
            .map(|file| file.writer(header))
            .transpose()?;
        VariantFilter::new(spec.clone()).run(records, &mut kept, &mut discarded)?
    };
    kept_file.commit()?;
    if let Some(file) = discarded_file {
        file.commit()?;
    }
    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_filter_vcf() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.vcf");
        let filtered = dir.path().join("filtered.vcf");
        let spec = FilterSpec::builder().qual_threshold(50.0).build().unwrap();
        let result = filter_vcf(
            "resources/mpileup.vcf",
            &output,
            Some(&filtered),
            &spec,
            false,
        )
        .unwrap();
        assert_eq!(result.total, result.kept + result.filtered);
        assert!(result.filtered > 0);
    }

    #[test]
    fn test_unknown_flavor_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.vcf");
        let spec = FilterSpec::default();
        assert!(matches!(
            filter_vcf("resources/bcftools.vcf", &output, None::<&Path>, &spec, false),
            Err(Error::UnsupportedFlavor { .. })
        ));
        let result =
            filter_vcf("resources/bcftools.vcf", &output, None::<&Path>, &spec, true).unwrap();
        assert_eq!(result.kept, result.total);
    }

    #[test]
    fn test_failed_pass_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.vcf");
        let filtered = dir.path().join("filtered.vcf");
        let records = VcfRecords::from_path("resources/mpileup.vcf").unwrap();
        let header = records.header().clone();
        let failing = records.take(3).chain(std::iter::once(Err(Error::Io(
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated input"),
        ))));
        let spec = FilterSpec::builder().qual_threshold(50.0).build().unwrap();

        let err = filter_into(failing, &header, &output, Some(filtered.as_path()), &spec)
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(!output.exists());
        assert!(!filtered.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
