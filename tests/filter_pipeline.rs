//! End-to-end filtering pipeline: raw remote stream through the banner
//! filter and the one-shot output normalizer.

use sshportal::filter::normalize;
use sshportal::BannerFilter;

#[test]
fn banner_and_echo_stripped_duplicates_collapsed() {
    let raw = "Welcome to X\nLast login: ...\nuser@host:~$ ls\nfile1\nfile1\n";

    let mut filter = BannerFilter::new();
    let visible = filter.process(raw);
    assert!(filter.cleared());

    let lines = normalize::clean(&visible, "ls");
    assert_eq!(lines, vec!["file1"]);
}

#[test]
fn pipeline_is_chunking_invariant() {
    let raw = "Welcome to X\nLast login: ...\nuser@host:~$ ls\nfile1\nfile1\n";

    for split in 1..raw.len() {
        let mut filter = BannerFilter::new();
        let mut visible = String::new();
        visible.push_str(&filter.process(&raw[..split]));
        visible.push_str(&filter.process(&raw[split..]));

        let lines = normalize::clean(&visible, "ls");
        assert_eq!(lines, vec!["file1"], "split at byte {}", split);
    }
}

#[test]
fn exec_output_without_banner_passes_normalizer_untouched() {
    let lines = normalize::clean("file1\nfile2\nfile3\n", "ls");
    assert_eq!(lines, vec!["file1", "file2", "file3"]);
}

#[test]
fn stream_without_prompt_yields_nothing() {
    let mut filter = BannerFilter::new();
    let visible = filter.process("Welcome to X\nnothing prompt-like here\n");
    assert_eq!(visible, "");
    assert!(normalize::clean(&visible, "ls").is_empty());
}
