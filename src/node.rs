//! 피어 주소/NAT 디스크립터
//!
//! 네트워크상의 노드 하나를 기술한다: 식별 키, 태스크/p2p 서버
//! 포트, 사설/공인 주소, NAT 타입. 주소 발견 자체는 이 크레이트
//! 밖의 일이며 AddressProbe 인터페이스로만 소비한다. 디스크립터는
//! 프레이밍에 관여하지 않고 주소만 공급한다.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::Result;

/// 주소 발견 인터페이스 (구현은 호스트 몫)
pub trait AddressProbe {
    /// 외부(공인) 주소 조회: (주소, 매핑된 포트, NAT 타입)
    fn external_address(&self, prv_port: Option<u16>) -> Result<(String, u16, String)>;

    /// 감지된 로컬 인터페이스 주소 목록
    fn host_addresses(&self) -> Vec<String>;

    /// 시드 호스트 기준 대표 로컬 주소
    fn host_address(&self, seed_host: Option<&str>) -> String;
}

/// 노드 디스크립터
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// 노드 이름
    pub node_name: Option<String>,

    /// 노드 공개키 (식별자)
    pub key: Option<String>,

    /// 태스크 서버 사설/공인 포트
    pub prv_port: Option<u16>,
    pub pub_port: Option<u16>,

    /// p2p 서버 사설/공인 포트
    pub p2p_prv_port: Option<u16>,
    pub p2p_pub_port: Option<u16>,

    /// 사설/공인 주소
    pub prv_addr: Option<String>,
    pub pub_addr: Option<String>,

    /// 감지된 사설 주소 목록
    #[serde(default)]
    pub prv_addresses: Vec<String>,

    /// NAT 타입
    pub nat_type: Option<String>,

    /// 포트 상태
    pub port_status: Option<String>,
}

impl Node {
    /// 프로브로 주소 정보 채우기
    ///
    /// 공인 주소가 비어 있으면 외부 주소를 조회하고, 사설 주소가
    /// 비어 있으면 감지된 주소에서 고른다. 설정된 사설 주소가
    /// 감지 목록에 없으면 경고만 남긴다.
    pub fn collect_network_info(
        &mut self,
        probe: &dyn AddressProbe,
        seed_host: Option<&str>,
    ) -> Result<()> {
        if self.pub_addr.is_none() {
            let (addr, port, nat_type) = probe.external_address(self.prv_port)?;
            self.pub_addr = Some(addr);
            if self.prv_port.is_some() {
                self.pub_port = Some(port);
            }
            self.nat_type = Some(nat_type);
        }

        self.prv_addresses = probe.host_addresses();

        if self.prv_addr.is_none() {
            let pub_addr = self.pub_addr.as_ref();
            if pub_addr.is_some_and(|a| self.prv_addresses.contains(a)) {
                self.prv_addr = self.pub_addr.clone();
            } else {
                self.prv_addr = Some(probe.host_address(seed_host));
            }
        }

        if let Some(prv_addr) = &self.prv_addr {
            if !self.prv_addresses.contains(prv_addr) {
                warn!(
                    "설정된 노드 주소 {}가 감지된 주소 목록에 없음: {:?}",
                    prv_addr, self.prv_addresses
                );
            }
        }

        Ok(())
    }

    /// 슈퍼 노드 여부 (공인 주소 == 사설 주소, 즉 NAT 없음)
    pub fn is_super_node(&self) -> bool {
        match (&self.pub_addr, &self.prv_addr) {
            (Some(pub_addr), Some(prv_addr)) => pub_addr == prv_addr,
            _ => false,
        }
    }

    /// JSON 직렬화
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e).into()
        })
    }

    /// JSON 역직렬화
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e).into()
        })
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Node {} (key: {})",
            self.node_name.as_deref().unwrap_or("?"),
            self.key.as_deref().unwrap_or("?")
        )
    }
}
