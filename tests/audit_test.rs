mod common;

use common::*;
use rosetta_checker::report::CsvReport;
use rosetta_checker::{
    Aggregation, AuditConfig, AuditError, Auditor, CsvIndex, ParentType, ReconciliationRecord,
};

const DOC: &[u8] = b"hello world\n";

fn config() -> AuditConfig {
    AuditConfig::default()
}

#[tokio::test]
async fn directory_with_file_and_zip_yields_one_record_per_unit() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("doc.txt"), DOC);
    let zip = ZipBuilder::new()
        .directory("scans/")
        .stored("scans/page-1.tif", b"first page")
        .deflated("scans/page-2.tif", b"second page, compressed")
        .build();
    let zip_path = write(&dir.path().join("archive.zip"), &zip);

    let mut index = CsvIndex::default();
    let (result, records) = audit(&config(), &mut index, &[arg(dir.path())]).await;
    let stats = result.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(stats.units, 3);
    assert_eq!(stats.errors, 0);

    let doc = records.iter().find(|r| r.file == "doc.txt").unwrap();
    assert_eq!(doc.parent_type, ParentType::Directory);
    assert_eq!(doc.parent, arg(dir.path()));
    assert_eq!(doc.size, 12);
    assert_eq!(doc.checksum, md5_hex(DOC));

    // Zip members are adjacent and in container order
    let members: Vec<&ReconciliationRecord> = records
        .iter()
        .filter(|r| r.parent_type == ParentType::ZipContainer)
        .collect();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].file, "scans/page-1.tif");
    assert_eq!(members[1].file, "scans/page-2.tif");
    assert!(members.iter().all(|r| r.parent == arg(&zip_path)));
    assert_eq!(members[1].size, b"second page, compressed".len() as u64);
    assert_eq!(members[1].checksum, md5_hex(b"second page, compressed"));
    let first = records.iter().position(|r| r.file == "scans/page-1.tif").unwrap();
    assert_eq!(records[first + 1].file, "scans/page-2.tif");
}

#[tokio::test]
async fn unmatched_content_still_produces_a_record() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir.path().join("new.txt"), b"never ingested");

    let mut index = index_with(&[(&b"something else"[..], stored_row("FL1", "new.txt"))]);
    let (result, records) = audit(&config(), &mut index, &[arg(&file)]).await;

    assert_eq!(result.unwrap().matched, 0);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].match_count, 0);
    assert_eq!(records[0].name_match, None);
    assert_eq!(records[0].row, None);
}

#[tokio::test]
async fn matched_content_is_name_checked() {
    let dir = tempfile::tempdir().unwrap();
    let data = b"annual report body";
    let file = write(&dir.path().join("Report_2021.pdf"), data);

    let mut index = index_with(&[(&data[..], stored_row("FL7", "Report 2021 final.pdf"))]);
    let (result, records) = audit(&config(), &mut index, &[arg(&file)]).await;

    let stats = result.unwrap();
    assert_eq!((stats.matched, stats.name_matched), (1, 1));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].match_count, 1);
    assert_eq!(records[0].name_match, Some(true));
    assert_eq!(records[0].row.as_ref().unwrap().fl_id, "FL7");
}

#[tokio::test]
async fn content_match_with_foreign_name() {
    let dir = tempfile::tempdir().unwrap();
    let data = b"x";
    let file = write(&dir.path().join("a.txt"), data);

    let mut index = index_with(&[(&data[..], stored_row("FL1", "completely_unrelated_name.bin"))]);
    let (_, records) = audit(&config(), &mut index, &[arg(&file)]).await;
    assert_eq!(records[0].match_count, 1);
    assert_eq!(records[0].name_match, Some(false));
}

#[tokio::test]
async fn several_rows_per_row_and_last_row() {
    let dir = tempfile::tempdir().unwrap();
    let data = b"duplicated content";
    let file = write(&dir.path().join("dup.dat"), data);
    let rows = [
        (&data[..], stored_row("FL1", "dup.dat")),
        (&data[..], stored_row("FL2", "other.dat")),
    ];

    let mut index = index_with(&rows);
    let (_, per_row) = audit(&config(), &mut index, &[arg(&file)]).await;
    assert_eq!(per_row.len(), 2);
    assert!(per_row.iter().all(|r| r.match_count == 2));
    assert_eq!(per_row[0].name_match, Some(true));
    assert_eq!(per_row[1].name_match, Some(false));

    let last_row = AuditConfig {
        aggregation: Aggregation::LastRow,
        ..config()
    };
    let mut index = index_with(&rows);
    let (_, flat) = audit(&last_row, &mut index, &[arg(&file)]).await;
    assert_eq!(flat.len(), 1);
    assert_eq!(flat[0].match_count, 2);
    assert_eq!(flat[0].row.as_ref().unwrap().fl_id, "FL2");
}

#[tokio::test]
async fn zero_byte_file_is_a_unit() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(&dir.path().join("empty"), b"");

    let (_, records) = audit(&config(), &mut CsvIndex::default(), &[arg(&file)]).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].size, 0);
    assert_eq!(records[0].checksum, "d41d8cd98f00b204e9800998ecf8427e");
}

#[tokio::test]
async fn bzip2_content_is_one_unit_named_without_extension() {
    let dir = tempfile::tempdir().unwrap();
    let data = b"decompressed payload ".repeat(100);
    let path = write(&dir.path().join("thesis.pdf.bz2"), &bzip2(&data));

    let mut index = index_with(&[(&data[..], stored_row("FL9", "thesis.pdf"))]);
    let (result, records) = audit(&config(), &mut index, &[arg(&path)]).await;

    assert_eq!(result.unwrap().units, 1);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.parent_type, ParentType::SingleStreamArchive);
    assert_eq!(record.parent, arg(&path));
    assert_eq!(record.file, "thesis.pdf");
    assert_eq!(record.size, data.len() as u64);
    assert_eq!(record.name_match, Some(true));
}

#[tokio::test]
async fn recursion_is_opt_in() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("top.txt"), b"top");
    write(&dir.path().join("sub/deeper/leaf.txt"), b"leaf");

    let (_, flat) = audit(&config(), &mut CsvIndex::default(), &[arg(dir.path())]).await;
    let names: Vec<_> = flat.iter().map(|r| r.file.as_str()).collect();
    assert_eq!(names, ["top.txt"]);

    let recursive = AuditConfig {
        recursive: true,
        ..config()
    };
    let (_, deep) = audit(&recursive, &mut CsvIndex::default(), &[arg(dir.path())]).await;
    let leaf = deep.iter().find(|r| r.file == "leaf.txt").unwrap();
    assert_eq!(leaf.parent, arg(&dir.path().join("sub/deeper")));
    assert_eq!(deep.len(), 2);
}

#[cfg(unix)]
#[tokio::test]
async fn link_back_to_an_ancestor_is_walked_once() {
    let dir = tempfile::tempdir().unwrap();
    let top = dir.path().join("top");
    write(&top.join("a.txt"), b"a");
    write(&top.join("real/b.txt"), b"b");
    std::os::unix::fs::symlink(&top, top.join("loop")).unwrap();
    std::os::unix::fs::symlink(top.join("real"), top.join("alias")).unwrap();

    let recursive = AuditConfig {
        recursive: true,
        ..config()
    };
    let (result, records) = audit(&recursive, &mut CsvIndex::default(), &[arg(&top)]).await;
    result.unwrap();

    let mut names: Vec<_> = records.iter().map(|r| r.file.as_str()).collect();
    names.sort_unstable();
    // The sibling link is a distinct path and is still followed
    assert_eq!(names, ["a.txt", "b.txt", "b.txt"]);
}

#[cfg(unix)]
#[tokio::test]
async fn special_files_in_a_directory_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"a");
    let pipe = dir.path().join("pipe");
    let status = std::process::Command::new("mkfifo").arg(&pipe).status().unwrap();
    assert!(status.success());

    let (result, records) = audit(&config(), &mut CsvIndex::default(), &[arg(dir.path())]).await;
    assert_eq!(result.unwrap().errors, 1);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].file, "a.txt");
}

#[tokio::test]
async fn list_file_with_a_missing_directory_keeps_going() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("present/one.txt"), b"1");
    write(&dir.path().join("present/two.txt"), b"22");
    let list = write(&dir.path().join("dirs.lst"), b"absent\npresent\n");

    let (result, records) = audit(
        &config(),
        &mut CsvIndex::default(),
        &[format!("@{}", arg(&list))],
    )
    .await;

    let stats = result.unwrap();
    assert_eq!(stats.errors, 1);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.parent == arg(&dir.path().join("present"))));
}

#[tokio::test]
async fn list_file_lines_resolve_against_the_list_directory() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("files/a.txt"), b"a");
    write(&dir.path().join("files/b.zip"), &ZipBuilder::new().stored("inner.txt", b"b").build());
    write(&dir.path().join("files/inner.lst"), b"a.txt\n");
    let list = write(
        &dir.path().join("files/all.lst"),
        b"# staged on monday\n\n  a.txt  \r\nb.zip\n@inner.lst\n",
    );

    let (result, records) = audit(
        &config(),
        &mut CsvIndex::default(),
        &[format!("@{}", arg(&list))],
    )
    .await;

    assert_eq!(result.unwrap().errors, 0);
    let files: Vec<_> = records.iter().map(|r| (r.parent_type, r.file.as_str())).collect();
    assert_eq!(
        files,
        [
            (ParentType::Directory, "a.txt"),
            (ParentType::ZipContainer, "inner.txt"),
            (ParentType::Directory, "a.txt"),
        ]
    );
}

#[tokio::test]
async fn self_referencing_list_file_stops_at_the_depth_limit() {
    let dir = tempfile::tempdir().unwrap();
    let list = write(&dir.path().join("loop.lst"), b"@loop.lst\n");

    let (result, records) = audit(
        &config(),
        &mut CsvIndex::default(),
        &[format!("@{}", arg(&list))],
    )
    .await;
    assert_eq!(result.unwrap().errors, 1);
    assert!(records.is_empty());
}

#[tokio::test]
async fn search_dirs_resolve_relative_arguments() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("staged/item.txt"), b"item");
    let with_search = AuditConfig {
        search_dirs: vec![dir.path().join("nowhere"), dir.path().join("staged")],
        ..config()
    };

    let (result, records) = audit(
        &with_search,
        &mut CsvIndex::default(),
        &["item.txt".to_string(), "not-anywhere.txt".to_string()],
    )
    .await;
    assert_eq!(result.unwrap().errors, 1);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].parent, arg(&dir.path().join("staged")));
}

#[tokio::test]
async fn unreadable_items_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("broken.zip"), b"PK but not really a zip archive");
    write(&dir.path().join("broken.bz2"), b"BZh9 garbage");
    write(&dir.path().join("fine.txt"), b"fine");

    let (result, records) = audit(&config(), &mut CsvIndex::default(), &[arg(dir.path())]).await;
    let stats = result.unwrap();
    assert_eq!(stats.errors, 2);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].file, "fine.txt");
}

#[tokio::test]
async fn lookup_failure_aborts_but_keeps_earlier_records() {
    let dir = tempfile::tempdir().unwrap();
    let first = write(&dir.path().join("first.txt"), b"1");
    let second = write(&dir.path().join("second.txt"), b"2");

    let mut lookup = FlakyLookup {
        inner: CsvIndex::default(),
        healthy: 1,
    };
    let (result, records) = audit(&config(), &mut lookup, &[arg(&first), arg(&second)]).await;

    let err = result.unwrap_err();
    assert!(matches!(err, AuditError::LookupFailure { .. }));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].file, "first.txt");
}

#[tokio::test]
async fn repeated_runs_produce_identical_reports() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"alpha");
    write(&dir.path().join("b.txt"), b"beta");
    write(
        &dir.path().join("c.zip"),
        &ZipBuilder::new()
            .deflated("x.txt", b"gamma")
            .stored("y.txt", b"delta")
            .build(),
    );

    async fn render(dir: &std::path::Path) -> Vec<u8> {
        let mut index = index_with(&[(&b"alpha"[..], stored_row("FL1", "a.txt"))]);
        let mut report = CsvReport::new(Vec::new(), "memory".to_string()).unwrap();
        Auditor::new(&AuditConfig::default(), &mut index, &mut report)
            .run(&[arg(dir)])
            .await
            .unwrap();
        report.into_inner().unwrap()
    }

    let first = render(dir.path()).await;
    let second = render(dir.path()).await;
    assert_eq!(first, second);
    assert_eq!(String::from_utf8(first).unwrap().lines().count(), 5);
}

#[tokio::test]
async fn special_files_are_invalid_arguments() {
    #[cfg(unix)]
    {
        let (result, records) = audit(
            &config(),
            &mut CsvIndex::default(),
            &["/dev/null".to_string()],
        )
        .await;
        assert_eq!(result.unwrap().errors, 1);
        assert!(records.is_empty());
    }
}
