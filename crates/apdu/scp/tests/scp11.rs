//! SCP11a, SCP11b and SCP11c sessions replayed against recorded transcripts

mod common;

use common::{
    OCE_CA, OCE_ECKA, PK_SD, SD_CA, SD_ECKA, SD_SIGN_ONLY, ScriptedTransport, concat,
    ephemeral_oce, init_tracing, oce_credentials, scp11_params,
};
use bytes::Bytes;
use hex_literal::hex;
use openscp::prelude::*;
use openscp::ProtocolError;
use p256::SecretKey;

const EPK_OCE: [u8; 65] = hex!(
    "0499e7002da2fa28cd1f02e7e60904f5e6aa93a3ed9891da78cdc219908bcea539"
    "bbf253226c04962838fbf00c4c360cac2b7e51ddfd966cba8b2e0d0f388750f5"
);
const EPK_SD: [u8; 65] = hex!(
    "041db06be25a8fcf37f33395287aabbbcd87d91e9ebc9642dfc0a81b1f648f8eaf"
    "d451647debc0ea5bc904ea594d2520cc7dfd2c0e491bb9442059bb7ff3b5a387"
);

const RECEIPT_11A: [u8; 16] = hex!("3e4ca2e06d4ab736207944d2055731ec");
const RECEIPT_11B: [u8; 16] = hex!("a57183edccde2236f9f39724dc3c2b99");
const RECEIPT_11C: [u8; 16] = hex!("44b9b0e747306ccf57cd77ac7889d5d0");

fn key_agreement_command(header: [u8; 4], key_info: [u8; 4]) -> Vec<u8> {
    concat(&[
        &header,
        &hex!("53a60d9002"),
        &key_info[..2],
        &hex!("95013c8001888101"),
        &key_info[2..3],
        &hex!("5f4941"),
        &EPK_OCE,
        &hex!("00"),
    ])
}

fn key_agreement_response(receipt: [u8; 16]) -> Vec<u8> {
    concat(&[&hex!("5f4941"), &EPK_SD, &hex!("8610"), &receipt, &hex!("9000")])
}

fn get_data_cplc() -> Apdu {
    Apdu::new(0x80, 0xCA, 0x00, 0x66).with_le(256)
}

fn with_sd_key(params: Scp11Params) -> Scp11Params {
    params.with_sd_public_key_der(PK_SD).unwrap()
}

#[test]
fn test_scp11a_transcript() {
    init_tracing();
    let mut transport = ScriptedTransport::new([hex!("9000"); 4]);
    transport.push_response(key_agreement_response(RECEIPT_11A));
    transport.push_response(hex!("d62deea838d92b5b637c1e24ebf9f6a526209740362e4efe9000"));

    let params = with_sd_key(scp11_params(0x11, AesAlg::Aes128));
    let mut session = SecurityDomainSession::new(transport);
    session
        .authenticate_scp11_with_ephemeral(&params, ScpMode::S8, ephemeral_oce())
        .unwrap();
    assert!(session.is_authenticated());

    let response = session.send(&get_data_cplc()).unwrap();
    assert_eq!(response.payload(), hex!("6601aa"));

    // each OCE certificate is split over two chained blocks
    let commands = &session.transport().commands;
    assert_eq!(commands.len(), 6);
    assert_eq!(commands[0][..5], hex!("902a0390ff"));
    assert_eq!(commands[0][5..], OCE_CA[..255]);
    assert_eq!(commands[1][..5], hex!("802a03903d"));
    assert_eq!(commands[1][5..], OCE_CA[255..]);
    assert_eq!(commands[2][..5], hex!("902a0310ff"));
    assert_eq!(commands[3][..5], hex!("802a03103a"));
    assert_eq!(commands[3][5..], OCE_ECKA[255..]);
    assert_eq!(
        commands[4],
        key_agreement_command(hex!("80820311"), hex!("11011000"))
    );
    assert_eq!(commands[5], hex!("84ca006608040baa9964c5317d00"));
}

#[test]
fn test_scp11a_extended_length() {
    let mut transport = ScriptedTransport::new([hex!("9000"); 2]).with_extended_length();
    transport.push_response(key_agreement_response(RECEIPT_11A));

    let params = with_sd_key(scp11_params(0x11, AesAlg::Aes128));
    let mut session = SecurityDomainSession::new(transport);
    session
        .authenticate_scp11_with_ephemeral(&params, ScpMode::S8, ephemeral_oce())
        .unwrap();

    let commands = &session.transport().commands;
    assert_eq!(commands.len(), 3);
    assert_eq!(commands[0][..7], hex!("802a039000013c"));
    assert_eq!(commands[0][7..], *OCE_CA);
    assert_eq!(commands[1][..7], hex!("802a0310000139"));
}

#[test]
fn test_scp11b_transcript() {
    let transport = ScriptedTransport::new([
        key_agreement_response(RECEIPT_11B),
        hex!(
            "e5a8b8db5272a3e4ea6adc4c037ea6c3ec92168e1277e3e66b83ee81ce3dcefc9000"
        )
        .to_vec(),
    ]);

    let params = with_sd_key(scp11_params(0x13, AesAlg::Aes256));
    let mut session = SecurityDomainSession::new(transport);
    session
        .authenticate_scp11_with_ephemeral(&params, ScpMode::S16, ephemeral_oce())
        .unwrap();
    assert_eq!(session.mode(), Some(ScpMode::S16));

    let response = session.send(&get_data_cplc()).unwrap();
    assert_eq!(response.payload(), hex!("6601aa"));

    let commands = &session.transport().commands;
    assert_eq!(
        commands[0],
        key_agreement_command(hex!("80880313"), hex!("11002000"))
    );
    assert_eq!(
        commands[1],
        hex!("84ca00661049b83bf0992c8a5c216e0eca96a8784a00")
    );
}

#[test]
fn test_scp11c_transcript() {
    let mut transport = ScriptedTransport::new([hex!("9000"); 2]).with_extended_length();
    transport.push_response(key_agreement_response(RECEIPT_11C));
    transport.push_response(hex!("d62deea838d92b5b637c1e24ebf9f6a5061c8d4b4045e03e9000"));

    let params = with_sd_key(scp11_params(0x15, AesAlg::Aes128));
    let mut session = SecurityDomainSession::new(transport);
    session
        .authenticate_scp11_with_ephemeral(&params, ScpMode::S8, ephemeral_oce())
        .unwrap();

    let response = session.send(&get_data_cplc()).unwrap();
    assert_eq!(response.payload(), hex!("6601aa"));

    let commands = &session.transport().commands;
    assert_eq!(
        commands[2],
        key_agreement_command(hex!("80820315"), hex!("11031000"))
    );
    assert_eq!(commands[3], hex!("84ca006608cf748377d575103100"));
}

#[test]
fn test_sd_key_from_certificate_bundle() {
    // the bundle arrives in three GET RESPONSE rounds
    let bundle = concat(&[SD_CA, SD_ECKA]);
    assert_eq!(bundle.len(), 624);
    let transport = ScriptedTransport::new([
        concat(&[&bundle[..256], &hex!("6100")]),
        concat(&[&bundle[256..512], &hex!("6170")]),
        concat(&[&bundle[512..], &hex!("9000")]),
        key_agreement_response(RECEIPT_11B),
    ]);

    let params = scp11_params(0x13, AesAlg::Aes256);
    let mut session = SecurityDomainSession::new(transport);
    session
        .authenticate_scp11_with_ephemeral(&params, ScpMode::S16, ephemeral_oce())
        .unwrap();

    let commands = &session.transport().commands;
    assert_eq!(commands[0], hex!("80cabf2106a6048302130300"));
    assert_eq!(commands[1], hex!("00c0000000"));
    assert_eq!(commands[2], hex!("00c0000070"));
    assert_eq!(
        commands[3],
        key_agreement_command(hex!("80880313"), hex!("11002000"))
    );
}

#[test]
fn test_unusable_bundle_stops_handshake() {
    for bundle in [hex!("9000").to_vec(), concat(&[SD_CA, SD_SIGN_ONLY, &hex!("9000")])] {
        let params = scp11_params(0x13, AesAlg::Aes128);
        let mut session = SecurityDomainSession::new(ScriptedTransport::new([bundle]));
        let err = session
            .authenticate_scp11_with_ephemeral(&params, ScpMode::S8, ephemeral_oce())
            .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert_eq!(session.state(), SessionState::Closed);
        // no key agreement after the bundle failed
        assert_eq!(session.transport().commands.len(), 1);
    }
}

#[test]
fn test_bundle_not_found() {
    let params = scp11_params(0x13, AesAlg::Aes128);
    let mut session = SecurityDomainSession::new(ScriptedTransport::new([hex!("6a88")]));
    let err = session
        .authenticate_scp11_with_ephemeral(&params, ScpMode::S8, ephemeral_oce())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError::UnexpectedStatus { command: "GET DATA", .. })
    ));
}

#[test]
fn test_bad_receipt() {
    let mut transport = ScriptedTransport::new([hex!("9000"); 2]).with_extended_length();
    transport.push_response(key_agreement_response([0x55; 16]));

    let params = with_sd_key(scp11_params(0x11, AesAlg::Aes128));
    let mut session = SecurityDomainSession::new(transport);
    let err = session
        .authenticate_scp11_with_ephemeral(&params, ScpMode::S8, ephemeral_oce())
        .unwrap_err();
    assert_eq!(err, Error::Crypto("receipt verification failed"));
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn test_mismatched_key_pair() {
    let unrelated = SecretKey::from_slice(&[0x11; 32]).unwrap();
    let cases = [
        // PK.SD from another card
        scp11_params(0x11, AesAlg::Aes128).with_sd_public_key(unrelated.public_key()),
        // SK.OCE that does not belong to the OCE certificate
        Scp11Params::new(KeyRef::new(0x11, 0x03), AesAlg::Aes128)
            .with_sd_public_key_der(PK_SD)
            .unwrap()
            .with_oce(OceCredentials::new(
                KeyRef::new(0x10, 0x03),
                unrelated,
                vec![Bytes::from_static(OCE_CA), Bytes::from_static(OCE_ECKA)],
            )),
    ];

    for params in cases {
        let mut transport = ScriptedTransport::new([hex!("9000"); 2]).with_extended_length();
        transport.push_response(key_agreement_response(RECEIPT_11A));
        let mut session = SecurityDomainSession::new(transport);
        let err = session
            .authenticate_scp11_with_ephemeral(&params, ScpMode::S8, ephemeral_oce())
            .unwrap_err();
        assert_eq!(err, Error::Crypto("receipt verification failed"));
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.transport().commands.len(), 3);
    }
}

#[test]
fn test_certificate_rejected() {
    let transport = ScriptedTransport::new([hex!("6a80")]).with_extended_length();
    let params = with_sd_key(scp11_params(0x11, AesAlg::Aes128));
    let mut session = SecurityDomainSession::new(transport);
    let err = session
        .authenticate_scp11_with_ephemeral(&params, ScpMode::S8, ephemeral_oce())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError::UnexpectedStatus {
            command: "PERFORM SECURITY OPERATION",
            ..
        })
    ));
    assert_eq!(session.transport().commands.len(), 1);
}

#[test]
fn test_chained_block_rejected() {
    let params = with_sd_key(scp11_params(0x11, AesAlg::Aes128));
    let mut session = SecurityDomainSession::new(ScriptedTransport::new([hex!("6700")]));
    let err = session
        .authenticate_scp11_with_ephemeral(&params, ScpMode::S8, ephemeral_oce())
        .unwrap_err();
    assert_eq!(
        err,
        Error::Protocol(ProtocolError::ChainingInterrupted(StatusWord::new(0x67, 0x00)))
    );
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn test_malformed_key_agreement_response() {
    let transport = ScriptedTransport::new([concat(&[&hex!("5f4941"), &EPK_SD, &hex!("9000")])]);
    let params = with_sd_key(scp11_params(0x13, AesAlg::Aes128));
    let mut session = SecurityDomainSession::new(transport);
    let err = session
        .authenticate_scp11_with_ephemeral(&params, ScpMode::S8, ephemeral_oce())
        .unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::Malformed(_))));
}

#[test]
fn test_config_errors_keep_idle() {
    let cases = [
        // SCP11a without OCE credentials
        Scp11Params::new(KeyRef::new(0x11, 0x03), AesAlg::Aes128),
        // SCP11b with OCE credentials
        Scp11Params::new(KeyRef::new(0x13, 0x03), AesAlg::Aes128).with_oce(oce_credentials()),
        // not an SCP11 key id
        Scp11Params::new(KeyRef::new(0x01, 0x03), AesAlg::Aes128),
    ];

    for params in cases {
        let mut session = SecurityDomainSession::new(ScriptedTransport::default());
        let err = session.authenticate(params, ScpMode::S8).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.transport().commands.is_empty());
    }
}
