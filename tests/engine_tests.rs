// tests/engine_tests.rs

use bb84::{Basis, Bb84Error, Gate, Observable, QuantumState, Simulator};
use rand::SeedableRng;
use rand::rngs::StdRng;

const TEST_TOLERANCE: f64 = 1e-9;
const BASES: [Basis; 2] = [Basis::Computational, Basis::Diagonal];

fn conjugate(basis: Basis) -> Basis {
    match basis {
        Basis::Computational => Basis::Diagonal,
        Basis::Diagonal => Basis::Computational,
    }
}

#[test]
fn test_same_basis_measurement_is_deterministic() -> Result<(), Bb84Error> {
    let sim = Simulator::new();
    let mut rng = StdRng::seed_from_u64(1984);
    for basis in BASES {
        for bit in [0u8, 1] {
            let state = sim.prepare(bit, basis)?;
            for _ in 0..200 {
                let m = sim.measure(&state, &Observable::of(basis), &mut rng)?;
                assert_eq!(m.bit(), bit, "bit {} in basis {}", bit, basis);
                assert!(m.collapsed.approx_eq(&state, TEST_TOLERANCE), "collapse moved {} to {}", state, m.collapsed);
            }
        }
    }
    Ok(())
}

#[test]
fn test_conjugate_basis_is_unbiased() -> Result<(), Bb84Error> {
    let sim = Simulator::new();
    let mut rng = StdRng::seed_from_u64(42);
    let trials = 2000usize;
    for basis in BASES {
        for bit in [0u8, 1] {
            let state = sim.prepare(bit, basis)?;
            let mut ones = 0usize;
            for _ in 0..trials {
                ones += usize::from(sim.measure_bit(&state, conjugate(basis), &mut rng)?);
            }
            // Two-sided proportion test against p = 0.5 at alpha = 0.001
            let n = trials as f64;
            let z = (ones as f64 - n * 0.5) / (n * 0.25).sqrt();
            assert!(z.abs() < 3.29, "bit {} basis {}: {} ones of {} (z = {:.2})", bit, basis, ones, trials, z);
        }
    }
    Ok(())
}

#[test]
fn test_conjugate_measurement_collapses_to_eigenvector() -> Result<(), Bb84Error> {
    let sim = Simulator::new();
    let mut rng = StdRng::seed_from_u64(7);
    let plus = sim.prepare(0, Basis::Diagonal)?;
    for _ in 0..50 {
        let m = sim.measure(&plus, &Observable::computational(), &mut rng)?;
        let expected = if m.bit() == 0 { QuantumState::zero() } else { QuantumState::one() };
        assert!(m.collapsed.approx_eq(&expected, TEST_TOLERANCE));
        // Re-measuring the collapsed state is now deterministic
        assert_eq!(sim.measure_bit(&m.collapsed, Basis::Computational, &mut rng)?, m.bit());
    }
    Ok(())
}

#[test]
fn test_double_hadamard_is_identity() -> Result<(), Bb84Error> {
    let sim = Simulator::new();
    let h = Gate::hadamard();
    let states = [
        QuantumState::zero(),
        QuantumState::one(),
        sim.prepare(1, Basis::Diagonal)?,
        sim.apply(&sim.prepare(0, Basis::Diagonal)?, &Gate::phase_s())?,
        QuantumState::from_real(0.6, -0.8)?,
    ];
    for state in states {
        let back = sim.apply(&sim.apply(&state, &h)?, &h)?;
        assert!(back.approx_eq(&state, TEST_TOLERANCE), "H·H changed {} to {}", state, back);
    }
    Ok(())
}

#[test]
fn test_pauli_gates_act_on_basis_states() -> Result<(), Bb84Error> {
    let sim = Simulator::new();
    let flipped = sim.apply(&QuantumState::zero(), &Gate::pauli_x())?;
    assert!(flipped.approx_eq(&QuantumState::one(), TEST_TOLERANCE));

    // Z maps |+> to |->
    let plus = sim.prepare(0, Basis::Diagonal)?;
    let minus = sim.prepare(1, Basis::Diagonal)?;
    assert!(sim.apply(&plus, &Gate::pauli_z())?.approx_eq(&minus, TEST_TOLERANCE));
    assert!(sim.apply(&plus, &Gate::identity())?.approx_eq(&plus, TEST_TOLERANCE));
    Ok(())
}

#[test]
fn test_construction_errors_are_fatal() {
    assert!(matches!(QuantumState::from_real(0.5, 0.5), Err(Bb84Error::Normalization { .. })));

    let sim = Simulator::new();
    let doubled = Gate::from_matrix([
        [2.0.into(), 0.0.into()],
        [0.0.into(), 2.0.into()],
    ]);
    assert!(matches!(sim.apply(&QuantumState::zero(), &doubled), Err(Bb84Error::NotUnitary { .. })));

    let mut rng = StdRng::seed_from_u64(0);
    let skew = Observable::from_matrix([
        [0.0.into(), 1.0.into()],
        [(-1.0).into(), 0.0.into()],
    ]);
    assert!(matches!(sim.measure(&QuantumState::zero(), &skew, &mut rng), Err(Bb84Error::NotHermitian { .. })));
}
