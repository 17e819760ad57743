use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyPair, KeyUsagePurpose, date_time_ymd,
};
use rustls::pki_types::CertificateDer;

pub struct TestPki {
    ca: Certificate,
    ca_key: KeyPair,
}

pub struct IssuedCert {
    pub cert: CertificateDer<'static>,
}

type Ymd = (i32, u8, u8);

impl TestPki {
    pub fn new() -> Self {
        let ca_key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params
            .distinguished_name
            .push(DnType::CommonName, "oxycheck test CA");
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        params.not_before = date_time_ymd(2000, 1, 1);
        params.not_after = date_time_ymd(2199, 1, 1);
        let ca = params.self_signed(&ca_key).unwrap();
        Self { ca, ca_key }
    }

    pub fn ca_der(&self) -> CertificateDer<'static> {
        self.ca.der().clone()
    }

    pub fn issue(&self, names: &[&str]) -> IssuedCert {
        self.issue_between(names, (2020, 1, 1), (2199, 1, 1))
    }

    pub fn issue_between(&self, names: &[&str], from: Ymd, to: Ymd) -> IssuedCert {
        let key = KeyPair::generate().unwrap();
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let mut params = CertificateParams::new(names.clone()).unwrap();
        params.distinguished_name.push(DnType::CommonName, names[0].clone());
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
        params.not_before = date_time_ymd(from.0, from.1, from.2);
        params.not_after = date_time_ymd(to.0, to.1, to.2);
        let cert = params.signed_by(&key, &self.ca, &self.ca_key).unwrap();

        IssuedCert {
            cert: cert.der().clone(),
        }
    }
}
