//! Kernel-side packet filter
//!
//! A six-instruction classic BPF program that admits only IPv4 frames
//! carrying UDP. Port matching stays in userspace (see `frame`).
//!
//! ```text
//! (000) ldh [12]              ; ethertype
//! (001) jeq #0x0800 jt 0 jf 3 ; IPv4?
//! (002) ldb [23]              ; IP protocol
//! (003) jeq #17 jt 0 jf 1     ; UDP?
//! (004) ret #65535            ; accept, snap 65535 bytes
//! (005) ret #0                ; drop
//! ```

use dstream_core::constants::{ETHERTYPE_IPV4, IPPROTO_UDP};

// Opcode fields from linux/bpf_common.h
pub const BPF_LD: u16 = 0x00;
pub const BPF_JMP: u16 = 0x05;
pub const BPF_RET: u16 = 0x06;
pub const BPF_H: u16 = 0x08;
pub const BPF_B: u16 = 0x10;
pub const BPF_ABS: u16 = 0x20;
pub const BPF_JEQ: u16 = 0x10;
pub const BPF_K: u16 = 0x00;

/// Bytes of an accepted frame handed to the socket
pub const SNAP_LEN: u32 = 65535;

/// One classic BPF instruction, laid out like `struct sock_filter`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insn {
    pub code: u16,
    pub jt: u8,
    pub jf: u8,
    pub k: u32,
}

const fn stmt(code: u16, k: u32) -> Insn {
    Insn { code, jt: 0, jf: 0, k }
}

const fn jump(code: u16, k: u32, jt: u8, jf: u8) -> Insn {
    Insn { code, jt, jf, k }
}

/// Accept IPv4/UDP, drop everything else
pub const UDP_IPV4_FILTER: [Insn; 6] = [
    stmt(BPF_LD | BPF_H | BPF_ABS, 12),
    jump(BPF_JMP | BPF_JEQ | BPF_K, ETHERTYPE_IPV4 as u32, 0, 3),
    stmt(BPF_LD | BPF_B | BPF_ABS, 23),
    jump(BPF_JMP | BPF_JEQ | BPF_K, IPPROTO_UDP as u32, 0, 1),
    stmt(BPF_RET | BPF_K, SNAP_LEN),
    stmt(BPF_RET | BPF_K, 0),
];

/// Kernel representation of `program`
#[cfg(target_os = "linux")]
pub fn to_sock_filter(program: &[Insn]) -> Vec<libc::sock_filter> {
    program
        .iter()
        .map(|i| libc::sock_filter {
            code: i.code,
            jt: i.jt,
            jf: i.jf,
            k: i.k,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::frame::synth::udp_frame;

    /// Interpreter for the subset of classic BPF the filter uses.
    /// Loads past the end drop the packet, as in the kernel.
    fn run(program: &[Insn], pkt: &[u8]) -> u32 {
        let mut acc: u32 = 0;
        let mut pc = 0usize;
        loop {
            let insn = program[pc];
            pc += 1;
            match insn.code {
                c if c == BPF_LD | BPF_H | BPF_ABS => {
                    let off = insn.k as usize;
                    if off + 2 > pkt.len() {
                        return 0;
                    }
                    acc = u16::from_be_bytes([pkt[off], pkt[off + 1]]) as u32;
                }
                c if c == BPF_LD | BPF_B | BPF_ABS => {
                    let off = insn.k as usize;
                    if off >= pkt.len() {
                        return 0;
                    }
                    acc = pkt[off] as u32;
                }
                c if c == BPF_JMP | BPF_JEQ | BPF_K => {
                    let off = if acc == insn.k { insn.jt } else { insn.jf };
                    pc += off as usize;
                }
                c if c == BPF_RET | BPF_K => return insn.k,
                c => panic!("unexpected opcode {:#x}", c),
            }
        }
    }

    #[test]
    fn test_jumps_stay_in_program() {
        for (pc, insn) in UDP_IPV4_FILTER.iter().enumerate() {
            if (insn.code & 0x07) == BPF_JMP {
                assert!(pc + 1 + (insn.jt as usize) < UDP_IPV4_FILTER.len());
                assert!(pc + 1 + (insn.jf as usize) < UDP_IPV4_FILTER.len());
            }
        }
        assert_eq!(UDP_IPV4_FILTER[5], stmt(BPF_RET | BPF_K, 0));
    }

    #[test]
    fn test_accepts_ipv4_udp() {
        let frame = udp_frame(5, 9999, b"payload");
        assert_eq!(run(&UDP_IPV4_FILTER, &frame), SNAP_LEN);

        // Port is not the filter's business
        let frame = udp_frame(7, 53, b"");
        assert_eq!(run(&UDP_IPV4_FILTER, &frame), SNAP_LEN);
    }

    #[test]
    fn test_rejects_other_traffic() {
        let mut tcp = udp_frame(5, 9999, &[0u8; 20]);
        tcp[23] = 6;
        assert_eq!(run(&UDP_IPV4_FILTER, &tcp), 0);

        let mut arp = udp_frame(5, 9999, &[0u8; 20]);
        arp[12..14].copy_from_slice(&0x0806u16.to_be_bytes());
        assert_eq!(run(&UDP_IPV4_FILTER, &arp), 0);

        let mut ipv6 = udp_frame(5, 9999, &[0u8; 20]);
        ipv6[12..14].copy_from_slice(&0x86DDu16.to_be_bytes());
        assert_eq!(run(&UDP_IPV4_FILTER, &ipv6), 0);

        assert_eq!(run(&UDP_IPV4_FILTER, &[0u8; 10]), 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_sock_filter_conversion() {
        let prog = to_sock_filter(&UDP_IPV4_FILTER);
        assert_eq!(prog.len(), 6);
        assert_eq!(prog[0].code, 0x28);
        assert_eq!(prog[1].k, 0x0800);
        assert_eq!((prog[1].jt, prog[1].jf), (0, 3));
        assert_eq!(prog[3].k, 17);
        assert_eq!(prog[4].k, 65535);
    }
}
