//! Redistribution of particle records between ranks after a change of the domain decomposition.

use log::debug;

use crate::{
    comm::Communicator,
    errors::ExchangeError,
    fields::{ParticleContainer, Property},
};

/// Exchange partners of `rank`, in round order.
///
/// In round `ngrp` (`1..2^ceil(log2 size)`) every rank pairs with `rank ^ ngrp`. Partners beyond
/// the world size are skipped, so both ranks of a pair always meet in the same round.
pub fn hypercube_partners(rank: usize, size: usize) -> impl Iterator<Item = usize> {
    let rounds = size.next_power_of_two();
    (1..rounds)
        .map(move |ngrp| rank ^ ngrp)
        .filter(move |&partner| partner < size)
}

/// Exclusive prefix sums of the per rank counts.
pub fn displacements(counts: &[usize]) -> Vec<usize> {
    counts
        .iter()
        .scan(0, |offset, &count| {
            let current = *offset;
            *offset += count;
            Some(current)
        })
        .collect()
}

/// Run the hypercube rounds for data that is already laid out for the exchange.
///
/// `send_data` holds the exported records sorted by destination rank, `send_counts[k]` of them
/// for rank `k`. The `recv_counts[k]` records arriving from rank `k` are written into every
/// property of `particles`, starting at `disp` plus the exclusive prefix sum of `recv_counts`.
/// Records destined for the calling rank itself are copied locally.
pub fn exchange_prepared<C: Communicator>(
    particles: &mut ParticleContainer,
    send_data: &ParticleContainer,
    send_counts: &[usize],
    recv_counts: &[usize],
    disp: usize,
    comm: &C,
) -> Result<(), ExchangeError> {
    let rank = comm.rank();
    let size = comm.size();
    if send_counts.len() != size || recv_counts.len() != size {
        return Err(ExchangeError::MalformedExport(format!(
            "expected counts for {size} ranks, got {} send and {} receive counts",
            send_counts.len(),
            recv_counts.len()
        )));
    }
    let total_send: usize = send_counts.iter().sum();
    if total_send != send_data.num_particles() {
        return Err(ExchangeError::MalformedExport(format!(
            "{total_send} records declared for export, but {} prepared",
            send_data.num_particles()
        )));
    }

    let total_recv: usize = recv_counts.iter().sum();
    for (name, property) in particles.properties_mut() {
        let available = property.len().saturating_sub(disp);
        if available < total_recv {
            return Err(ExchangeError::InsufficientReceiveSpace {
                property: name.to_string(),
                required: total_recv,
                available,
            });
        }
    }

    let offset_send = displacements(send_counts);
    let offset_recv = displacements(recv_counts);

    // Records that stay on this rank
    if send_counts[rank] != recv_counts[rank] {
        return Err(ExchangeError::SizeMismatch {
            partner: rank,
            expected: recv_counts[rank],
            received: send_counts[rank],
        });
    }
    for (name, property) in particles.properties_mut() {
        let send = send_data.get(name)?;
        let send_range = offset_send[rank]..offset_send[rank] + send_counts[rank];
        let recv_range =
            disp + offset_recv[rank]..disp + offset_recv[rank] + recv_counts[rank];
        match (send, property) {
            (Property::F64(send), Property::F64(recv)) => {
                recv[recv_range].copy_from_slice(&send[send_range])
            }
            (Property::I64(send), Property::I64(recv)) => {
                recv[recv_range].copy_from_slice(&send[send_range])
            }
            _ => return Err(ExchangeError::PropertyType(name.to_string())),
        }
    }

    for partner in hypercube_partners(rank, size) {
        if send_counts[partner] == 0 && recv_counts[partner] == 0 {
            continue;
        }
        debug!(
            "Rank {rank}: exchanging {} / {} records with rank {partner}",
            send_counts[partner], recv_counts[partner]
        );
        let send_range = offset_send[partner]..offset_send[partner] + send_counts[partner];
        let recv_range =
            disp + offset_recv[partner]..disp + offset_recv[partner] + recv_counts[partner];
        for (name, property) in particles.properties_mut() {
            match (send_data.get(name)?, property) {
                (Property::F64(send), Property::F64(recv)) => comm.send_recv(
                    &send[send_range.clone()],
                    &mut recv[recv_range.clone()],
                    partner,
                )?,
                (Property::I64(send), Property::I64(recv)) => comm.send_recv(
                    &send[send_range.clone()],
                    &mut recv[recv_range.clone()],
                    partner,
                )?,
                _ => return Err(ExchangeError::PropertyType(name.to_string())),
            }
        }
    }
    Ok(())
}

/// Move the particles `export_ids` to the ranks `export_ranks`, collectively over all ranks.
///
/// Exported particles are removed locally and the incoming ones are appended at the end of the
/// container, grouped by source rank. Returns the number of records received from every rank.
pub fn exchange_particles<C: Communicator>(
    particles: &mut ParticleContainer,
    export_ids: &[usize],
    export_ranks: &[usize],
    comm: &C,
) -> Result<Vec<usize>, ExchangeError> {
    let size = comm.size();
    if export_ids.len() != export_ranks.len() {
        return Err(ExchangeError::MalformedExport(format!(
            "{} export ids but {} destination ranks",
            export_ids.len(),
            export_ranks.len()
        )));
    }
    if let Some(&rank) = export_ranks.iter().find(|&&rank| rank >= size) {
        return Err(ExchangeError::MalformedExport(format!(
            "destination rank {rank} outside of a world of size {size}"
        )));
    }
    let mut seen = vec![false; particles.num_particles()];
    for &id in export_ids {
        match seen.get_mut(id) {
            Some(flag) if !*flag => *flag = true,
            Some(_) => {
                return Err(ExchangeError::MalformedExport(format!(
                    "particle {id} exported twice"
                )))
            }
            None => {
                return Err(ExchangeError::MalformedExport(format!(
                    "export of particle {id}, but only {} particles present",
                    particles.num_particles()
                )))
            }
        }
    }

    // Put the exports in rank order
    let mut order: Vec<usize> = (0..export_ids.len()).collect();
    order.sort_by_key(|&i| export_ranks[i]);
    let sorted_ids: Vec<usize> = order.iter().map(|&i| export_ids[i]).collect();
    let mut send_counts = vec![0; size];
    for &rank in export_ranks {
        send_counts[rank] += 1;
    }

    let send_data = particles.extract(&sorted_ids)?;
    particles.remove(&sorted_ids)?;

    let recv_counts = comm.all_to_all_counts(&send_counts)?;
    let current_size = particles.num_particles();
    particles.resize(current_size + recv_counts.iter().sum::<usize>());

    exchange_prepared(
        particles,
        &send_data,
        &send_counts,
        &recv_counts,
        current_size,
        comm,
    )?;
    Ok(recv_counts)
}
