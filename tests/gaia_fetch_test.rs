//! Remote cone-search behaviour against a mocked VizieR endpoint: the first
//! query populates the cache, later ones are served from it.
use camino::Utf8Path;
use httpmock::prelude::*;

use astrodiff::env_state::AstrodiffEnv;
use astrodiff::footprint::Tile;
use astrodiff::gaia;

const TSV_BODY: &str = "\
#INFO queried catalogue I/355
RAJ2000\tDEJ2000\tpmRA\tpmDE\tGmag
deg\tdeg\tmas/yr\tmas/yr\tmag
-------\t-------\t-----\t-----\t-----
150.000100\t-33.500200\t1.2\t-3.4\t16.5
150.100000\t-33.400000\t\t\t18.1
";

fn tile() -> Tile {
    Tile {
        name: "TESTTILE-01".to_string(),
        ra: 150.05,
        dec: -33.45,
    }
}

#[test]
fn fetch_populates_the_cache_and_later_calls_never_requery() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/viz-bin/asu-tsv");
        then.status(200).body(TSV_BODY);
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let workdir = Utf8Path::from_path(dir.path()).expect("utf8 path");
    let env = AstrodiffEnv::new();
    let tile = tile();

    let entries =
        gaia::load_or_fetch(&env, workdir, &server.base_url(), "355", &tile, 1.0).expect("fetch");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].pm_ra, Some(1.2));
    assert!(gaia::cache_path(workdir, "355", &tile.name).is_file());
    mock.assert_hits(1);

    let cached =
        gaia::load_or_fetch(&env, workdir, &server.base_url(), "355", &tile, 1.0).expect("cached");
    assert_eq!(cached.len(), 2);
    assert_eq!(cached[1].g_mag, Some(18.1));
    mock.assert_hits(1);
}

#[test]
fn empty_remote_catalogue_is_an_error_and_writes_no_cache() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/viz-bin/asu-tsv");
        then.status(200)
            .body("#INFO nothing found\nRAJ2000\tDEJ2000\tpmRA\tpmDE\tGmag\n");
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let workdir = Utf8Path::from_path(dir.path()).expect("utf8 path");
    let env = AstrodiffEnv::new();
    let tile = tile();

    let result = gaia::load_or_fetch(&env, workdir, &server.base_url(), "355", &tile, 1.0);
    assert!(result.is_err());
    assert!(!gaia::cache_path(workdir, "355", &tile.name).is_file());
}
