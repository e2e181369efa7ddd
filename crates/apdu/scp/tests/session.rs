//! Session state rules

mod common;

use common::{SD_CA, SD_ECKA, ScriptedTransport, concat, scp03_params};
use hex_literal::hex;
use openscp::prelude::*;
use openscp::ProtocolError;

fn authenticated() -> SecurityDomainSession<ScriptedTransport> {
    let mut session = SecurityDomainSession::new(ScriptedTransport::new([
        &hex!("000102030405060708093003001011121314151617a330f60b35761cbf9000")[..],
        &hex!("9000"),
    ]));
    session
        .authenticate_scp03_with_challenge(
            &scp03_params(),
            ScpMode::S8,
            &hex!("0001020304050607"),
        )
        .unwrap();
    session
}

#[test]
fn test_new_session_is_idle() {
    let session = SecurityDomainSession::new(ScriptedTransport::default());
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.mode(), None);
    assert_eq!(session.config(), &SessionConfig::default());
    assert_eq!(session.config().max_get_response, 10);
}

#[test]
fn test_authenticate_only_once() {
    let mut session = authenticated();
    let err = session.authenticate(scp03_params(), ScpMode::S8).unwrap_err();
    assert_eq!(
        err,
        Error::InvalidState {
            operation: "authenticate",
            state: SessionState::Authenticated
        }
    );
    assert!(session.is_authenticated());
    assert_eq!(session.transport().commands.len(), 2);
}

#[test]
fn test_close_after_authentication() {
    let mut session = authenticated();
    session.close();
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(session.mode(), None);

    session.close();
    assert_eq!(session.transport().closed, 1);

    for result in [
        session.send(&Apdu::new(0x80, 0xCA, 0x00, 0x66)).map(drop),
        session.authenticate(scp03_params(), ScpMode::S8),
    ] {
        assert!(matches!(
            result,
            Err(Error::InvalidState {
                state: SessionState::Closed,
                ..
            })
        ));
    }
}

#[test]
fn test_close_after_failure_closes_transport_once() {
    let mut session = SecurityDomainSession::new(ScriptedTransport::new([hex!("6982")]));
    assert!(session.authenticate(scp03_params(), ScpMode::S8).is_err());
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(session.transport().closed, 0);

    session.close();
    session.close();
    assert_eq!(session.transport().closed, 1);
}

#[test]
fn test_certificate_bundle_before_authentication() {
    let mut session = SecurityDomainSession::new(ScriptedTransport::new([concat(&[
        SD_ECKA,
        SD_CA,
        &hex!("9000"),
    ])]));
    let chain = session.get_certificate_bundle(KeyRef::new(0x11, 0x03)).unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.security_domain_certificate().unwrap().der(), SD_ECKA);

    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(
        session.transport().commands[0],
        hex!("80cabf2106a6048302110300")
    );
}

#[test]
fn test_certificate_bundle_failure_closes_session() {
    let mut session = SecurityDomainSession::new(ScriptedTransport::new([hex!("01029000")]));
    let err = session
        .get_certificate_bundle(KeyRef::new(0x11, 0x03))
        .unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::Malformed(_))));
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn test_certificate_bundle_through_secure_channel() {
    let mut session = authenticated();
    session.transport_mut().push_response(hex!("6a88"));

    let err = session
        .get_certificate_bundle(KeyRef::new(0x11, 0x03))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError::UnexpectedStatus { command: "GET DATA", .. })
    ));
    // wrapped with C-MAC and C-DECRYPTION
    assert_eq!(session.transport().commands[2][..5], hex!("84cabf2118"));
}
