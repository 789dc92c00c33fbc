//! 便捷 API 与配置读取集成测试

use pg_slowlog_parser::{
    ParseError, PgConfig, iter_slow_logs_from_file, parse_slow_logs_from_file,
    parse_slow_logs_from_files, parse_slow_logs_from_string,
};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_parse_from_file() {
    let file = write_temp(
        "2023-10-08 13:14:26.366 GMT [47] LOG:  duration: 1009.444 ms  statement: SELECT\n\tpg_sleep(1)\n",
    );

    let logs = parse_slow_logs_from_file(file.path(), "%m [%p] ").unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].statement, "SELECT\npg_sleep(1)");
}

#[test]
fn test_iter_from_file_tracks_bytes() {
    let content = "2023-10-08 13:14:26.366 GMT [47] LOG:  duration: 1.0 ms  statement: SELECT 1\r\n\
                   2023-10-08 13:14:27.366 GMT [48] LOG:  duration: 2.0 ms  statement: SELECT 2";
    let file = write_temp(content);

    let mut parser = iter_slow_logs_from_file(file.path(), "%m [%p] ").unwrap();
    let first = parser.next().unwrap().unwrap();
    assert_eq!(first.statement, "SELECT 1");
    let second = parser.next().unwrap().unwrap();
    assert_eq!(second.statement, "SELECT 2");
    assert!(parser.next().is_none());

    assert_eq!(parser.bytes_read(), content.len() as u64);
    assert_eq!(first.bytes_read + second.bytes_read, content.len() as u64);
}

#[test]
fn test_missing_file() {
    let err = parse_slow_logs_from_file("/nonexistent/postgresql.log", "%m [%p] ").unwrap_err();
    assert!(matches!(err, ParseError::FileNotFound { .. }));
}

#[test]
fn test_parse_many_files_in_parallel_keeps_order() {
    let files: Vec<NamedTempFile> = (0..8)
        .map(|i| {
            let mut content = String::new();
            for j in 0..=i {
                content.push_str(&format!(
                    "2023-10-08 13:14:26 UTC [{j}] LOG:  duration: {i}.5 ms  statement: SELECT {i}\n"
                ));
            }
            write_temp(&content)
        })
        .collect();
    let mut paths: Vec<_> = files.iter().map(|f| f.path().to_path_buf()).collect();
    paths.push("/nonexistent/postgresql.log".into());

    let results = parse_slow_logs_from_files(&paths, "%t [%p] ").unwrap();
    assert_eq!(results.len(), 9);

    for (i, result) in results.iter().take(8).enumerate() {
        let logs = result.as_ref().unwrap();
        assert_eq!(logs.len(), i + 1);
        assert!(logs.iter().all(|log| log.statement == format!("SELECT {i}")));
        assert_eq!(
            logs[0].duration,
            Duration::from_micros(i as u64 * 1_000 + 500)
        );
    }
    assert!(matches!(results[8], Err(ParseError::FileNotFound { .. })));
}

#[test]
fn test_parallel_parse_reports_errors_per_file() {
    let paths = ["/nonexistent/a.log", "/nonexistent/b.log"];
    let results = parse_slow_logs_from_files(&paths, "%m [%p] ").unwrap();

    assert_eq!(results.len(), 2);
    assert!(
        results
            .iter()
            .all(|r| matches!(r, Err(ParseError::FileNotFound { .. })))
    );
}

#[test]
fn test_prefix_from_config_file() {
    let conf = write_temp(
        "# log settings\n\
         log_min_duration_statement = 1000\t# ms\n\
         log_line_prefix = '%t [%p]: user=%u,db=%d,app=%a,client=%h '\t# special values\n",
    );
    let config = PgConfig::from_file(conf.path()).unwrap();
    assert_eq!(
        config.log_min_duration_statement(),
        Some(Duration::from_secs(1))
    );

    let log = "2023-10-08 13:14:26 UTC [47]: user=postgres,db=app,app=psql,client=[local] LOG:  duration: 1500.000 ms  statement: UPDATE t
\tSET x = 1
2023-10-08 13:14:27 UTC [28]: user=,db=,app=,client= LOG:  checkpoint starting: time
";
    let logs = parse_slow_logs_from_string(log, config.log_line_prefix()).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].statement, "UPDATE t\nSET x = 1");
    assert_eq!(logs[0].duration, Duration::from_millis(1500));
}
