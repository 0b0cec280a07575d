use chrono::NaiveTime;
use squid_tagger_domain::{
    parse_netmask, DomainError, DomainLabels, RuleRecord, SiteTagAssignment, TagSet,
};
use std::io::{Read, Write};
use tracing::warn;

pub const SITE_HEADER: [&str; 3] = ["site", "tags", "regexp"];

pub const RULE_HEADER: [&str; 7] = [
    "netmask",
    "redirect_url",
    "from_weekday",
    "to_weekday",
    "from_time",
    "to_time",
    "tag",
];

const TIME_FORMAT: &str = "%H:%M:%S";

fn csv_error(e: csv::Error) -> DomainError {
    DomainError::CsvError(e.to_string())
}

fn at_line(line: u64, e: DomainError) -> DomainError {
    DomainError::CsvError(format!("line {line}: {e}"))
}

fn check_header<R: Read>(reader: &mut csv::Reader<R>, expected: &[&str]) -> Result<(), DomainError> {
    let found = reader.headers().map_err(csv_error)?;
    if found.iter().map(str::trim).eq(expected.iter().copied()) {
        return Ok(());
    }
    Err(DomainError::InvalidCsvHeader {
        expected: expected.join(","),
        found: found.iter().collect::<Vec<_>>().join(","),
    })
}

fn optional(field: &str) -> Option<&str> {
    let field = field.trim();
    (!field.is_empty()).then_some(field)
}

pub fn write_sites<W: Write>(output: W, rows: &[SiteTagAssignment]) -> Result<(), DomainError> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(SITE_HEADER).map_err(csv_error)?;

    for row in rows {
        writer
            .write_record([
                row.site.to_string(),
                row.tags.to_string(),
                row.regexp.clone().unwrap_or_default(),
            ])
            .map_err(csv_error)?;
    }

    writer.flush()?;
    Ok(())
}

/// Read a site/tag export. Rows without a site (SquidGuard expressions) have
/// nothing to attach to and are skipped with a warning.
pub fn read_sites<R: Read>(input: R) -> Result<Vec<SiteTagAssignment>, DomainError> {
    let mut reader = csv::Reader::from_reader(input);
    check_header(&mut reader, &SITE_HEADER)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let line = record.position().map_or(0, |p| p.line());

        let Some(site) = optional(&record[0]) else {
            warn!(line, regexp = &record[2], "Skipping row without a site");
            continue;
        };

        let site = DomainLabels::parse(site).map_err(|e| at_line(line, e))?;
        let tags = record[1].parse::<TagSet>().map_err(|e| at_line(line, e))?;
        rows.push(SiteTagAssignment::new(
            site,
            tags,
            optional(&record[2]).map(str::to_string),
        ));
    }

    Ok(rows)
}

pub fn write_rules<W: Write>(output: W, rows: &[RuleRecord]) -> Result<(), DomainError> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(RULE_HEADER).map_err(csv_error)?;

    let text = |v: Option<i16>| v.map(|v| v.to_string()).unwrap_or_default();
    let time = |t: Option<NaiveTime>| t.map(|t| t.format(TIME_FORMAT).to_string()).unwrap_or_default();

    for rule in rows {
        writer
            .write_record([
                rule.netmask.map(|n| n.to_string()).unwrap_or_default(),
                rule.redirect_url.clone(),
                text(rule.from_weekday),
                text(rule.to_weekday),
                time(rule.from_time),
                time(rule.to_time),
                rule.tags.to_string(),
            ])
            .map_err(csv_error)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn read_rules<R: Read>(input: R) -> Result<Vec<RuleRecord>, DomainError> {
    let mut reader = csv::Reader::from_reader(input);
    check_header(&mut reader, &RULE_HEADER)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let line = record.position().map_or(0, |p| p.line());
        let rule = parse_rule(&record).map_err(|e| at_line(line, e))?;
        rows.push(rule);
    }

    Ok(rows)
}

fn parse_rule(record: &csv::StringRecord) -> Result<RuleRecord, DomainError> {
    Ok(RuleRecord {
        netmask: parse_netmask(&record[0])?,
        redirect_url: record[1].trim().to_string(),
        from_weekday: parse_weekday(&record[2])?,
        to_weekday: parse_weekday(&record[3])?,
        from_time: parse_time(&record[4])?,
        to_time: parse_time(&record[5])?,
        tags: record[6].parse()?,
    })
}

fn parse_weekday(field: &str) -> Result<Option<i16>, DomainError> {
    optional(field)
        .map(|raw| {
            raw.parse::<i16>()
                .map_err(|_| DomainError::InvalidSchedule(format!("weekday '{raw}' is not a number")))
        })
        .transpose()
}

fn parse_time(field: &str) -> Result<Option<NaiveTime>, DomainError> {
    optional(field)
        .map(|raw| {
            NaiveTime::parse_from_str(raw, TIME_FORMAT)
                .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
                .map_err(|_| DomainError::InvalidSchedule(format!("time '{raw}' is not HH:MM[:SS]")))
        })
        .transpose()
}
